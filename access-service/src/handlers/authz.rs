//! Authorization decision endpoints.
//!
//! `GET /authz/can` backs the record pages' control gating and always
//! answers with a boolean - unknown input and storage trouble degrade to
//! deny, never to an error, so UIs fall back to read-only. `POST
//! /authz/check` is the resource-scoped variant that also enforces the
//! tenant boundary.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Operation, SecurityEvent, SecurityEventType};
use crate::services::EffectiveContext;
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CanQuery {
    pub resource_type: String,
    pub operation: String,
}

#[derive(Debug, Serialize)]
pub struct CanResponse {
    pub allowed: bool,
}

/// Evaluate whether the effective context may perform an operation.
///
/// GET /authz/can
pub async fn can(
    State(state): State<AppState>,
    Extension(ctx): Extension<EffectiveContext>,
    Query(query): Query<CanQuery>,
) -> Json<CanResponse> {
    // Unrecognized operation strings deny rather than erroring.
    let allowed = match query.operation.parse::<Operation>() {
        Ok(operation) => {
            state
                .permissions
                .can_perform_in_context(&ctx, &query.resource_type, operation)
                .await
        }
        Err(()) => false,
    };

    if !allowed {
        counter!("authz_denials_total").increment(1);
    }

    Json(CanResponse { allowed })
}

/// Resource-scoped authorization check.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub resource_type: String,
    pub operation: Operation,
    /// Organization the target record belongs to.
    pub resource_organization_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub acting_user_id: Uuid,
    pub acting_org_id: Uuid,
    pub responsible_actor_id: Uuid,
    pub is_impersonating: bool,
}

/// Check an operation against a concrete record's organization.
///
/// A record outside the effective organization is rejected outright with
/// `CrossOrganization` (403) for every role except a real platform
/// super-admin; a matrix denial is a normal `allowed: false` answer.
///
/// POST /authz/check
pub async fn check(
    State(state): State<AppState>,
    Extension(ctx): Extension<EffectiveContext>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    if let Err(e) = ctx.assert_org_scope(req.resource_organization_id) {
        counter!("authz_denials_total").increment(1);
        state.audit.record(SecurityEvent::actor_action(
            SecurityEventType::CrossOrganizationDenied,
            ctx.responsible_actor_id,
            Some(ctx.acting_user_id),
            Some(ctx.acting_org_id),
            Some(serde_json::json!({
                "requested_organization_id": req.resource_organization_id,
                "resource_type": req.resource_type,
                "operation": req.operation.as_str(),
            })),
        ));
        return Err(AppError::from(e));
    }

    let allowed = state
        .permissions
        .can_perform_in_context(&ctx, &req.resource_type, req.operation)
        .await;

    if !allowed {
        counter!("authz_denials_total").increment(1);
        state.audit.record(SecurityEvent::actor_action(
            SecurityEventType::PermissionDenied,
            ctx.responsible_actor_id,
            Some(ctx.acting_user_id),
            Some(ctx.acting_org_id),
            Some(serde_json::json!({
                "resource_type": req.resource_type,
                "operation": req.operation.as_str(),
            })),
        ));
    }

    Ok(Json(CheckResponse {
        allowed,
        acting_user_id: ctx.acting_user_id,
        acting_org_id: ctx.acting_org_id,
        responsible_actor_id: ctx.responsible_actor_id,
        is_impersonating: ctx.is_impersonating,
    }))
}
