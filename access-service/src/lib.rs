pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AccessConfig;
use crate::services::{AuditService, MasqueradeService, PermissionService, ScopeService};
use crate::store::AccessStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AccessConfig,
    pub store: Arc<dyn AccessStore>,
    pub permissions: PermissionService,
    pub scope: ScopeService,
    pub masquerade: MasqueradeService,
    pub audit: AuditService,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: AccessConfig,
        store: Arc<dyn AccessStore>,
        metrics: PrometheusHandle,
    ) -> Self {
        let audit = AuditService::new(store.clone());
        let session_ttl = chrono::Duration::minutes(config.masquerade.session_ttl_minutes);
        Self {
            permissions: PermissionService::new(store.clone()),
            scope: ScopeService::new(store.clone()),
            masquerade: MasqueradeService::new(store.clone(), audit.clone(), session_ttl),
            audit,
            store,
            config,
            metrics,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Routes that operate on a resolved effective context. The middleware
    // rejects requests it cannot resolve, so these handlers always see an
    // `Extension<EffectiveContext>`.
    let context_routes = Router::new()
        .route("/authz/can", get(handlers::authz::can))
        .route("/authz/check", post(handlers::authz::check))
        .route(
            "/orgs/:org_id/members/:user_id/role",
            put(handlers::members::change_role),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::context_middleware,
        ));

    // Routes keyed on the real caller only: masquerade lifecycle, matrix
    // administration, ledger reads and observability.
    let direct_routes = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/masquerade/start", post(handlers::masquerade::start))
        .route("/masquerade/end", post(handlers::masquerade::end))
        .route(
            "/admin/permission-rules",
            put(handlers::rules::upsert_rule).get(handlers::rules::list_rules),
        )
        .route("/audit/events", get(handlers::audit::list_events));

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect::<Vec<HeaderValue>>();

    direct_routes
        .merge(context_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::HeaderName::from_static(middleware::USER_ID_HEADER),
                    header::HeaderName::from_static(middleware::MASQUERADE_TOKEN_HEADER),
                    header::HeaderName::from_static(middleware::ORG_ID_HEADER),
                ]),
        )
}

/// Service health check.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Storage health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
