//! Health probes. Mounted outside the metrics middleware.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// 503 until at least one credential configuration is loaded; without one
/// every credential request is refused.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.endpoint.config().credentials_supported.is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, "no credentials configured");
    }
    (StatusCode::OK, "ready")
}
