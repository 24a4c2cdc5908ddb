//! Organization scope guard - derives the effective identity for a request.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::context::EffectiveContext;
use crate::services::error::AccessError;
use crate::services::masquerade::hash_token;
use crate::store::AccessStore;

/// Turns (caller id, optional masquerade token, optional organization
/// selection) into an [`EffectiveContext`].
#[derive(Clone)]
pub struct ScopeService {
    store: Arc<dyn AccessStore>,
}

impl ScopeService {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self { store }
    }

    /// Resolve the effective context for one request.
    ///
    /// With a token the caller must own an active, unexpired session; the
    /// acting identity becomes the impersonation target while the
    /// responsible actor stays the super-admin. Expiry is checked against
    /// the wall clock here, independent of the background sweep. Without a
    /// token the caller acts as themselves inside one of their own
    /// organizations.
    pub async fn resolve_context(
        &self,
        caller_user_id: Uuid,
        session_token: Option<&str>,
        selected_org: Option<Uuid>,
    ) -> Result<EffectiveContext, AccessError> {
        let is_super_admin = self
            .store
            .is_super_admin(caller_user_id)
            .await
            .map_err(AccessError::from)?;

        match session_token {
            Some(token) => {
                self.resolve_masquerade(caller_user_id, token, is_super_admin)
                    .await
            }
            None => {
                self.resolve_own(caller_user_id, selected_org, is_super_admin)
                    .await
            }
        }
    }

    async fn resolve_masquerade(
        &self,
        caller_user_id: Uuid,
        token: &str,
        is_super_admin: bool,
    ) -> Result<EffectiveContext, AccessError> {
        let session = self
            .store
            .find_session_by_token_hash(&hash_token(token))
            .await
            .map_err(AccessError::from)?
            .ok_or(AccessError::Unauthorized)?;

        // A token presented by anyone but the session's super-admin is
        // worthless, as is an ended or expired session.
        if session.super_admin_id != caller_user_id {
            return Err(AccessError::Unauthorized);
        }
        if !session.is_resolvable(Utc::now()) {
            return Err(AccessError::Unauthorized);
        }

        let org = self
            .store
            .find_organization(session.target_organization_id)
            .await
            .map_err(AccessError::from)?
            .ok_or(AccessError::NotFound("organization"))?;
        if !org.is_active() {
            return Err(AccessError::Forbidden);
        }

        let acting_role = self
            .store
            .find_membership(session.target_user_id, session.target_organization_id)
            .await
            .map_err(AccessError::from)?
            .map(|m| m.role);

        Ok(EffectiveContext {
            acting_user_id: session.target_user_id,
            acting_org_id: session.target_organization_id,
            acting_role,
            responsible_actor_id: session.super_admin_id,
            is_impersonating: true,
            is_super_admin,
        })
    }

    async fn resolve_own(
        &self,
        caller_user_id: Uuid,
        selected_org: Option<Uuid>,
        is_super_admin: bool,
    ) -> Result<EffectiveContext, AccessError> {
        let org_id = match selected_org {
            Some(org_id) => org_id,
            None => {
                // The organization selection is a UI concern; without one we
                // can only infer an unambiguous single membership.
                let memberships = self
                    .store
                    .list_memberships_for_user(caller_user_id)
                    .await
                    .map_err(AccessError::from)?;
                match memberships.as_slice() {
                    [only] => only.organization_id,
                    _ => return Err(AccessError::Unauthorized),
                }
            }
        };

        let acting_role = match self
            .store
            .find_membership(caller_user_id, org_id)
            .await
            .map_err(AccessError::from)?
        {
            Some(m) => Some(m.role),
            // Only the platform grant may scope into an organization the
            // caller holds no membership in.
            None if is_super_admin => None,
            None => return Err(AccessError::Unauthorized),
        };

        let org = self
            .store
            .find_organization(org_id)
            .await
            .map_err(AccessError::from)?
            .ok_or(AccessError::NotFound("organization"))?;
        if !org.is_active() && !is_super_admin {
            return Err(AccessError::Forbidden);
        }

        Ok(EffectiveContext {
            acting_user_id: caller_user_id,
            acting_org_id: org_id,
            acting_role,
            responsible_actor_id: caller_user_id,
            is_impersonating: false,
            is_super_admin,
        })
    }
}
