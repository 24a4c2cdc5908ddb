//! Masquerade session endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::CallerIdentity;
use crate::AppState;
use service_core::error::AppError;

/// Request to begin impersonating a user inside one organization.
#[derive(Debug, Deserialize)]
pub struct StartMasqueradeRequest {
    pub target_user_id: Uuid,
    pub target_organization_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StartMasqueradeResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Start a masquerade session.
///
/// POST /masquerade/start
pub async fn start(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(req): Json<StartMasqueradeRequest>,
) -> Result<Json<StartMasqueradeResponse>, AppError> {
    let started = state
        .masquerade
        .start(caller, req.target_user_id, req.target_organization_id)
        .await
        .map_err(AppError::from)?;

    Ok(Json(StartMasqueradeResponse {
        session_token: started.session_token,
        expires_at: started.expires_utc,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EndMasqueradeRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct EndMasqueradeResponse {
    pub ended: bool,
    pub ended_at: DateTime<Utc>,
}

/// End a masquerade session. Returns 409 `NotActive` when there is nothing
/// to end, so callers can tell the two outcomes apart.
///
/// POST /masquerade/end
pub async fn end(
    State(state): State<AppState>,
    Json(req): Json<EndMasqueradeRequest>,
) -> Result<Json<EndMasqueradeResponse>, AppError> {
    let ended = state
        .masquerade
        .end(&req.session_token)
        .await
        .map_err(AppError::from)?;

    Ok(Json(EndMasqueradeResponse {
        ended: true,
        ended_at: ended.ended_utc.unwrap_or_else(Utc::now),
    }))
}
