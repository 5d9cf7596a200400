//! Metrics exposition endpoint.

use crate::state::AppState;
use axum::{
    extract::State, http::header::CONTENT_TYPE, http::StatusCode, response::IntoResponse,
    routing::get, Router,
};

/// Creates the metrics route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Returns all collected metrics in Prometheus text format.
///
/// Meant for the scraper on the private network; keep it off the public
/// ingress alongside the widget endpoints.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}
