//! Security ledger read endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::CallerIdentity;
use crate::models::{Role, SecurityEvent};
use crate::services::AccessError;
use crate::AppState;
use service_core::error::AppError;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub organization_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditEventResponse {
    pub event_id: Uuid,
    pub event_type: String,
    pub actor_user_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub detail: Option<serde_json::Value>,
    pub system_initiated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SecurityEvent> for AuditEventResponse {
    fn from(e: SecurityEvent) -> Self {
        Self {
            event_id: e.event_id,
            event_type: e.event_type_code,
            actor_user_id: e.actor_user_id,
            target_user_id: e.target_user_id,
            organization_id: e.organization_id,
            detail: e.detail,
            system_initiated: e.system_initiated,
            created_at: e.created_utc,
        }
    }
}

fn can_read_org_audit(role: Role) -> bool {
    matches!(role, Role::Owner | Role::Admin | Role::Administrator)
}

/// List security events, newest first.
///
/// Super-admins may read any organization's ledger (or all of it). Everyone
/// else must name an organization where they hold an administrative role.
///
/// GET /audit/events
pub async fn list_events(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEventResponse>>, AppError> {
    let is_super_admin = state
        .store
        .is_super_admin(caller)
        .await
        .map_err(|e| AppError::from(AccessError::from(e)))?;

    if !is_super_admin {
        let org_id = query
            .organization_id
            .ok_or_else(|| AppError::from(AccessError::Forbidden))?;
        let membership = state
            .store
            .find_membership(caller, org_id)
            .await
            .map_err(|e| AppError::from(AccessError::from(e)))?;
        match membership {
            Some(m) if can_read_org_audit(m.role) => {}
            _ => return Err(AppError::from(AccessError::Forbidden)),
        }
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let events = state
        .audit
        .list(query.organization_id, limit)
        .await
        .map_err(AppError::from)?;

    Ok(Json(events.into_iter().map(AuditEventResponse::from).collect()))
}
