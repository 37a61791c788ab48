use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::json;

use crate::{db, AppState};

/// Liveness plus a database ping.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "up" })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": err.to_string() })),
        ),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
