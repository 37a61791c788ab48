use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::entities::traffic_source;
use crate::errors::ServiceError;
use crate::services::traffic::{CreateTrafficSourceRequest, TrafficCount};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TrafficWindow {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Visit tracking is called by the storefront before sign-in, so this
/// endpoint is unauthenticated.
#[utoipa::path(
    post,
    path = "/traffic-sources",
    request_body = CreateTrafficSourceRequest,
    responses((status = 200, description = "Visit recorded")),
    tag = "Traffic"
)]
pub async fn record_visit(
    State(state): State<AppState>,
    Json(request): Json<CreateTrafficSourceRequest>,
) -> Json<ApiResponse<traffic_source::Model>> {
    respond(state.services.traffic.create(request).await)
}

#[utoipa::path(
    get,
    path = "/traffic-sources",
    params(TrafficWindow),
    responses((status = 200, description = "Visit counts by source")),
    security(("bearer_auth" = [])),
    tag = "Traffic"
)]
pub async fn list_sources(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(window): Query<TrafficWindow>,
) -> Result<Json<ApiResponse<Vec<TrafficCount>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(
        state
            .services
            .traffic
            .find_all(window.start_date.as_deref(), window.end_date.as_deref())
            .await,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(record_visit).get(list_sources))
}
