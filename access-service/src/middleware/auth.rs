//! Request identity extraction and effective-context resolution.
//!
//! Authentication itself happens upstream (the gateway verifies the login
//! session and forwards the user id); this service only consumes the
//! resulting identity headers and resolves them into an explicit
//! [`EffectiveContext`] per request.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use service_core::error::AppError;

/// Authenticated caller id, forwarded by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Opaque masquerade session token, when the caller is impersonating.
pub const MASQUERADE_TOKEN_HEADER: &str = "x-masquerade-token";
/// Organization selection for callers with more than one membership.
pub const ORG_ID_HEADER: &str = "x-org-id";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Extractor for the real, authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
            .map(CallerIdentity)
            .ok_or_else(|| unauthorized("Missing or invalid x-user-id header"))
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Resolve the effective context for the request and stash it in the
/// request extensions. Handlers behind this middleware take
/// `Extension<EffectiveContext>`.
pub async fn context_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = req.headers();

    let caller = caller_from_headers(headers).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing or invalid x-user-id header"))
    })?;
    let token = header_string(headers, MASQUERADE_TOKEN_HEADER);
    let selected_org = header_string(headers, ORG_ID_HEADER)
        .map(|v| {
            Uuid::parse_str(&v)
                .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid x-org-id header")))
        })
        .transpose()?;

    let ctx = state
        .scope
        .resolve_context(caller, token.as_deref(), selected_org)
        .await
        .map_err(AppError::from)?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
