//! Effective request context - who is acting, and who answers for it.

use serde::Serialize;
use uuid::Uuid;

use crate::models::Role;
use crate::services::error::AccessError;

/// The resolved identity and organization scope for one request.
///
/// Built per request by the scope guard and passed explicitly into every
/// authorization decision; there is deliberately no ambient "current
/// session" anywhere in the service.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveContext {
    /// The identity whose role governs permission checks. Under masquerade
    /// this is the impersonated user.
    pub acting_user_id: Uuid,
    /// The organization every domain query must be scoped to.
    pub acting_org_id: Uuid,
    /// The acting user's role in `acting_org_id`. `None` only for a platform
    /// super-admin operating without a membership; the matrix can never
    /// allow such a context, only the super-admin bypass can.
    pub acting_role: Option<Role>,
    /// The accountable identity for audit records. Under masquerade this
    /// stays the super-admin, never the assumed user.
    pub responsible_actor_id: Uuid,
    pub is_impersonating: bool,
    /// Whether the *real* caller holds the platform super-admin grant.
    /// Global reach is a property of that grant, not of impersonation.
    pub is_super_admin: bool,
}

impl EffectiveContext {
    /// Reject any touch of a record outside the effective organization.
    /// Only the real caller's super-admin grant crosses tenant boundaries,
    /// and never while impersonating: a masquerade session is bound to one
    /// organization.
    pub fn assert_org_scope(&self, resource_org_id: Uuid) -> Result<(), AccessError> {
        if resource_org_id == self.acting_org_id || (self.is_super_admin && !self.is_impersonating)
        {
            Ok(())
        } else {
            Err(AccessError::CrossOrganization)
        }
    }
}
