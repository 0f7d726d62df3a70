//! Unified error taxonomy for the ordering core
//!
//! - [`CoreError`]: typed errors returned by every engine operation
//! - [`ErrorCategory`]: classification by domain, with retry semantics
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 7xxx: Table errors
//! - 9xxx: System errors
//!
//! Every atomic unit either fully applies or fully aborts; an error from
//! the core never leaves a partial commit behind. The transport boundary
//! maps each variant to a distinct status code so clients can distinguish
//! "retry me" from "fix your input" from "doesn't exist / not yours".

mod category;

pub use category::ErrorCategory;

use crate::models::order::OrderStatus;
use thiserror::Error;

/// Typed error returned by all core operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    /// Malformed input: empty items, bad quantity, unrecognized status,
    /// batch too large. Never retried internally.
    #[error("{0}")]
    Validation(String),

    /// Referenced record does not exist under the given tenant.
    /// Cross-tenant access is deliberately indistinguishable from true
    /// absence.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Requested edge is not in the status transition graph
    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Order number collision retries exhausted
    #[error("order creation conflict: gave up after {attempts} attempts")]
    OrderCreationConflict { attempts: u32 },

    /// Optimistic write lost a race; the caller may retry the whole
    /// operation
    #[error("concurrent modification of {resource}")]
    ConcurrencyConflict { resource: String },

    /// Business precondition not met (table inactive or occupied, active
    /// orders present in a delete batch). `offending` names the records
    /// that blocked the operation.
    #[error("{message}")]
    PreconditionFailed {
        message: String,
        offending: Vec<String>,
    },

    /// Storage backend fault (timeout, unavailable, corrupted)
    #[error("repository error: {0}")]
    Repository(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn concurrency(resource: impl Into<String>) -> Self {
        Self::ConcurrencyConflict {
            resource: resource.into(),
        }
    }

    pub fn precondition(message: impl Into<String>, offending: Vec<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
            offending,
        }
    }

    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Stable numeric code for the transport boundary
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) => 2,
            Self::NotFound { .. } => 3,
            Self::InvalidStatusTransition { .. } => 4001,
            Self::OrderCreationConflict { .. } => 4002,
            Self::ConcurrencyConflict { .. } => 4003,
            Self::PreconditionFailed { .. } => 4004,
            Self::Repository(_) => 9002,
        }
    }

    /// Category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidStatusTransition { .. } => ErrorCategory::Precondition,
            Self::OrderCreationConflict { .. } => ErrorCategory::Conflict,
            Self::ConcurrencyConflict { .. } => ErrorCategory::Conflict,
            Self::PreconditionFailed { .. } => ErrorCategory::Precondition,
            Self::Repository(_) => ErrorCategory::System,
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_statuses() {
        let err = CoreError::InvalidStatusTransition {
            from: OrderStatus::Served,
            to: OrderStatus::Preparing,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: served -> preparing"
        );
    }

    #[test]
    fn test_not_found_hides_tenancy() {
        // Cross-tenant and truly-absent produce the same message
        let a = CoreError::not_found("order");
        let b = CoreError::not_found("order");
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_retryable_split() {
        assert!(CoreError::concurrency("order").is_retryable());
        assert!(
            CoreError::OrderCreationConflict { attempts: 5 }.is_retryable()
        );
        assert!(!CoreError::validation("empty items").is_retryable());
        assert!(!CoreError::not_found("table").is_retryable());
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(CoreError::validation("x").code(), 2);
        assert_eq!(CoreError::not_found("x").code(), 3);
        assert_eq!(
            CoreError::OrderCreationConflict { attempts: 5 }.code(),
            4002
        );
    }
}
