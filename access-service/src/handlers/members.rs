//! Membership administration endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{
    MembershipResponse, Operation, Role, SecurityEvent, SecurityEventType,
};
use crate::services::{AccessError, EffectiveContext};
use crate::store::StoreError;
use crate::AppState;
use service_core::error::AppError;

/// Resource type key for membership administration in the permission matrix.
const MEMBERS_RESOURCE: &str = "organization_members";

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Change the single role a member holds in an organization.
///
/// PUT /orgs/:org_id/members/:user_id/role
pub async fn change_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<EffectiveContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<Json<MembershipResponse>, AppError> {
    ctx.assert_org_scope(org_id).map_err(AppError::from)?;

    if !state
        .permissions
        .can_perform_in_context(&ctx, MEMBERS_RESOURCE, Operation::Edit)
        .await
    {
        return Err(AppError::from(AccessError::Forbidden));
    }

    let membership = state
        .store
        .update_member_role(user_id, org_id, req.role)
        .await
        .map_err(|e| match e {
            StoreError::RowNotFound => AppError::from(AccessError::NotFound("membership")),
            other => AppError::from(AccessError::from(other)),
        })?;

    state.audit.record(SecurityEvent::actor_action(
        SecurityEventType::RoleChanged,
        ctx.responsible_actor_id,
        Some(user_id),
        Some(org_id),
        Some(serde_json::json!({ "new_role": req.role.as_str() })),
    ));

    Ok(Json(MembershipResponse::from(membership)))
}
