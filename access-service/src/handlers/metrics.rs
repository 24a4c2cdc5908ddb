//! Prometheus exposition endpoint.

use axum::extract::State;

use crate::AppState;

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
