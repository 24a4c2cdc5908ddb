//! Permission resolver - the single decision point for the permission matrix.

use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;

use crate::models::{Operation, PermissionRule, Role};
use crate::services::context::EffectiveContext;
use crate::services::error::AccessError;
use crate::store::AccessStore;

/// Resolves (role, resource type, operation) against the permission matrix.
///
/// Rules change rarely, so resolved rows are cached read-through; any rule
/// update replaces the cache entry before the update reports success, so a
/// later lookup can never observe a stale, more permissive rule.
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn AccessStore>,
    cache: Arc<DashMap<(Role, String), PermissionRule>>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self {
            store,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Whether `role` may perform `operation` on `resource_type`.
    ///
    /// Never errors: unknown resource types and missing rules deny, and a
    /// storage fault denies as well ("cannot determine" equals deny). The
    /// owner bypass is hard-coded here, not data-driven, so no matrix
    /// misconfiguration can revoke it.
    pub async fn can_perform(
        &self,
        role: Role,
        resource_type: &str,
        operation: Operation,
    ) -> bool {
        if role.is_owner() {
            return true;
        }

        let key = (role, resource_type.to_string());
        if let Some(rule) = self.cache.get(&key) {
            return rule.allows(operation);
        }

        match self.store.find_rule(role, resource_type).await {
            Ok(Some(rule)) => {
                let allowed = rule.allows(operation);
                self.cache.insert(key, rule);
                allowed
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    role = %role,
                    resource_type = %resource_type,
                    operation = %operation,
                    error = %e,
                    "Permission lookup failed; denying"
                );
                counter!("authz_lookup_failures_total").increment(1);
                false
            }
        }
    }

    /// Context-aware check. The platform super-admin bypass applies only
    /// when the caller acts as themselves; under masquerade the decision is
    /// the target role's, so support staff see exactly what the user sees.
    /// A context with no organization role can never be allowed through the
    /// matrix.
    pub async fn can_perform_in_context(
        &self,
        ctx: &EffectiveContext,
        resource_type: &str,
        operation: Operation,
    ) -> bool {
        if ctx.is_super_admin && !ctx.is_impersonating {
            return true;
        }
        match ctx.acting_role {
            Some(role) => self.can_perform(role, resource_type, operation).await,
            None => false,
        }
    }

    /// Create or replace a matrix rule. The cache entry is replaced before
    /// success is reported.
    pub async fn upsert_rule(&self, rule: PermissionRule) -> Result<(), AccessError> {
        self.store
            .upsert_rule(&rule)
            .await
            .map_err(|e| AccessError::Storage(anyhow::anyhow!(e)))?;
        self.cache
            .insert((rule.role, rule.resource_type.clone()), rule);
        Ok(())
    }

    pub async fn list_rules(&self) -> Result<Vec<PermissionRule>, AccessError> {
        self.store
            .list_rules()
            .await
            .map_err(|e| AccessError::Storage(anyhow::anyhow!(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAccessStore;

    fn service() -> PermissionService {
        PermissionService::new(Arc::new(MemoryAccessStore::new()))
    }

    #[tokio::test]
    async fn unconfigured_pairs_deny_every_operation() {
        let svc = service();
        for role in Role::ALL {
            if role.is_owner() {
                continue;
            }
            for op in Operation::ALL {
                assert!(
                    !svc.can_perform(role, "patients", op).await,
                    "{role} should be denied {op} without a rule"
                );
            }
        }
    }

    #[tokio::test]
    async fn owner_bypasses_matrix_for_everything() {
        let svc = service();
        for op in Operation::ALL {
            assert!(svc.can_perform(Role::Owner, "anything_at_all", op).await);
        }
    }

    #[tokio::test]
    async fn rule_flags_apply_independently() {
        let svc = service();
        svc.upsert_rule(PermissionRule::new(
            Role::RegisteredNurse,
            "medical_records",
            true,
            true,
            false,
            false,
        ))
        .await
        .unwrap();

        assert!(
            svc.can_perform(Role::RegisteredNurse, "medical_records", Operation::View)
                .await
        );
        assert!(
            svc.can_perform(Role::RegisteredNurse, "medical_records", Operation::Create)
                .await
        );
        assert!(
            !svc.can_perform(Role::RegisteredNurse, "medical_records", Operation::Edit)
                .await
        );
        assert!(
            !svc.can_perform(Role::RegisteredNurse, "medical_records", Operation::Delete)
                .await
        );
        // Same role, different resource type: still default-deny.
        assert!(
            !svc.can_perform(Role::RegisteredNurse, "invoices", Operation::View)
                .await
        );
    }

    #[tokio::test]
    async fn rule_update_is_visible_immediately() {
        let svc = service();
        svc.upsert_rule(PermissionRule::new(
            Role::Staff,
            "timesheets",
            true,
            false,
            true,
            false,
        ))
        .await
        .unwrap();
        // Warm the cache.
        assert!(svc.can_perform(Role::Staff, "timesheets", Operation::Edit).await);

        // Tighten the rule; the cached permissive row must not survive.
        svc.upsert_rule(PermissionRule::new(
            Role::Staff,
            "timesheets",
            true,
            false,
            false,
            false,
        ))
        .await
        .unwrap();
        assert!(!svc.can_perform(Role::Staff, "timesheets", Operation::Edit).await);
        assert!(svc.can_perform(Role::Staff, "timesheets", Operation::View).await);
    }
}
