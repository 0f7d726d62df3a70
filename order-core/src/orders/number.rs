//! Order number generation
//!
//! Numbers are human-readable, unique within `(tenant, calendar day)`:
//! `PREFIX-YYYYMMDD-NNN`. The calendar day is computed in the business
//! timezone. The next sequence is derived from the most recently
//! *created* order carrying the day's prefix, ordered by creation
//! time rather than lexically on the number, to tolerate clock or
//! format drift in historical data.
//!
//! This generator does not lock: two concurrent callers can compute the
//! same next number. Correctness is enforced by the storage uniqueness
//! constraint plus the caller's conflict-retry loop.

use crate::repository::{OrderRepository, RepoResult};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use shared::types::TenantId;

/// Minimum zero-padding of the sequence part
const SEQUENCE_PAD: usize = 3;

/// Per-tenant-per-day sequential number generator
#[derive(Debug, Clone)]
pub struct OrderNumberGenerator {
    prefix: String,
    tz: Tz,
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>, tz: Tz) -> Self {
        Self {
            prefix: prefix.into(),
            tz,
        }
    }

    /// `PREFIX-YYYYMMDD-` for the business day containing `now`
    pub fn day_prefix(&self, now: DateTime<Utc>) -> String {
        let date = now.with_timezone(&self.tz).format("%Y%m%d");
        format!("{}-{}-", self.prefix, date)
    }

    /// Compute the next number for this tenant's current business day
    pub async fn next_number<R>(&self, repo: &R, tenant: &TenantId) -> RepoResult<String>
    where
        R: OrderRepository + ?Sized,
    {
        let prefix = self.day_prefix(Utc::now());
        let latest = repo.latest_order_with_number_prefix(tenant, &prefix).await?;
        let next = latest
            .as_ref()
            .and_then(|o| parse_sequence(&o.order_number))
            .map_or(1, |seq| seq + 1);
        Ok(format!("{}{:0pad$}", prefix, next, pad = SEQUENCE_PAD))
    }
}

/// Trailing numeric sequence of an order number, if parsable
fn parse_sequence(number: &str) -> Option<u64> {
    number.rsplit('-').next()?.parse().ok()
}
