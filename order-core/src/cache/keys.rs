//! Tenant-scoped cache key builders
//!
//! Every key is prefixed with the owning tenant so invalidation can be
//! scoped by pattern without ever touching another tenant's entries.
//! Patterns support a single trailing `*` wildcard.

use shared::types::TenantId;

/// Single order by id
pub fn order(tenant: &TenantId, order_id: &str) -> String {
    format!("tenant:{}:orders:id:{}", tenant, order_id)
}

/// Kitchen display view (active orders)
pub fn kitchen(tenant: &TenantId) -> String {
    format!("tenant:{}:orders:kitchen", tenant)
}

/// Dashboard aggregates
pub fn dashboard(tenant: &TenantId) -> String {
    format!("tenant:{}:dashboard:summary", tenant)
}

/// Pattern covering every order-scoped entry for a tenant
pub fn orders_pattern(tenant: &TenantId) -> String {
    format!("tenant:{}:orders:*", tenant)
}

/// Pattern covering every table-scoped entry for a tenant
pub fn tables_pattern(tenant: &TenantId) -> String {
    format!("tenant:{}:tables:*", tenant)
}

/// Pattern covering dashboard aggregates for a tenant
pub fn dashboard_pattern(tenant: &TenantId) -> String {
    format!("tenant:{}:dashboard:*", tenant)
}

/// Match a key against a pattern with an optional trailing `*`
pub fn matches(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_tenant_scoped() {
        let t1 = TenantId::new("t1");
        let t2 = TenantId::new("t2");
        assert_ne!(order(&t1, "o1"), order(&t2, "o1"));
        assert!(order(&t1, "o1").starts_with("tenant:t1:"));
    }

    #[test]
    fn test_pattern_matching() {
        let t = TenantId::new("t1");
        assert!(matches(&order(&t, "o1"), &orders_pattern(&t)));
        assert!(matches(&kitchen(&t), &orders_pattern(&t)));
        assert!(!matches(&dashboard(&t), &orders_pattern(&t)));
        // Exact match without wildcard
        assert!(matches("a:b", "a:b"));
        assert!(!matches("a:b:c", "a:b"));
    }

    #[test]
    fn test_pattern_never_crosses_tenants() {
        let t1 = TenantId::new("t1");
        let t2 = TenantId::new("t2");
        assert!(!matches(&order(&t2, "o1"), &orders_pattern(&t1)));
    }
}
