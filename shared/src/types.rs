//! Tenant and actor identity types
//!
//! Every core call receives an already-authorized [`TenantContext`].
//! Tenancy resolution itself (API keys, sessions) happens upstream and
//! is out of scope here.

use serde::{Deserialize, Serialize};

/// Tenant identifier (one restaurant account)
///
/// All data is partitioned by this value. Newtype so a tenant id can
/// never be confused with an order or table id in a call signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Resolved tenant context threaded through every core call
///
/// Carries the tenant identity plus the settings snapshot the engine
/// needs at call time. `tax_rate` is a fraction (0.08 = 8%), resolved
/// from tenant settings upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub tax_rate: f64,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<TenantId>, tax_rate: f64) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tax_rate,
        }
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque actor reference recorded in order status history
///
/// Supplied by the caller (an employee id, a device id), never validated
/// by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: String,
    pub name: Option<String>,
}

impl ActorRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_roundtrip() {
        let id = TenantId::new("rest_01");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"rest_01\"");
        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_actor_ref_named() {
        let actor = ActorRef::named("emp_7", "Ana");
        assert_eq!(actor.id, "emp_7");
        assert_eq!(actor.name.as_deref(), Some("Ana"));
    }
}
