//! Permission matrix administration - super-admin configuration surface.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::CallerIdentity;
use crate::models::{PermissionRule, Role};
use crate::services::AccessError;
use crate::AppState;
use service_core::error::AppError;

async fn require_super_admin(state: &AppState, caller: uuid::Uuid) -> Result<(), AppError> {
    let is_super_admin = state
        .store
        .is_super_admin(caller)
        .await
        .map_err(|e| AppError::from(AccessError::from(e)))?;
    if is_super_admin {
        Ok(())
    } else {
        Err(AppError::from(AccessError::Forbidden))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertRuleRequest {
    pub role: Role,
    pub resource_type: String,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
}

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub role: Role,
    pub resource_type: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl From<PermissionRule> for RuleResponse {
    fn from(r: PermissionRule) -> Self {
        Self {
            role: r.role,
            resource_type: r.resource_type,
            can_view: r.can_view,
            can_create: r.can_create,
            can_edit: r.can_edit,
            can_delete: r.can_delete,
        }
    }
}

/// Create or replace one matrix rule.
///
/// PUT /admin/permission-rules
pub async fn upsert_rule(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(req): Json<UpsertRuleRequest>,
) -> Result<Json<RuleResponse>, AppError> {
    require_super_admin(&state, caller).await?;

    let rule = PermissionRule::new(
        req.role,
        req.resource_type,
        req.can_view,
        req.can_create,
        req.can_edit,
        req.can_delete,
    );
    state
        .permissions
        .upsert_rule(rule.clone())
        .await
        .map_err(AppError::from)?;

    Ok(Json(RuleResponse::from(rule)))
}

/// List the configured matrix.
///
/// GET /admin/permission-rules
pub async fn list_rules(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<Vec<RuleResponse>>, AppError> {
    require_super_admin(&state, caller).await?;

    let rules = state.permissions.list_rules().await.map_err(AppError::from)?;
    Ok(Json(rules.into_iter().map(RuleResponse::from).collect()))
}
