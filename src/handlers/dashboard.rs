use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::dashboard::{DashboardOverview, UserOverview};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OverviewFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    params(OverviewFilter),
    responses((status = 200, description = "Admin dashboard overview")),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn admin_overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<OverviewFilter>,
) -> Result<Json<ApiResponse<DashboardOverview>>, ServiceError> {
    // Vendors get their own scoped dashboard; everyone else needs admin.
    if user.role != "vendor" {
        user.require_admin()?;
    }
    Ok(respond(
        state
            .services
            .dashboard
            .admin_overview(
                Some(user.user_id),
                filter.start_date.as_deref(),
                filter.end_date.as_deref(),
            )
            .await,
    ))
}

#[utoipa::path(
    get,
    path = "/home/dashboard",
    responses((status = 200, description = "Signed-in user's dashboard")),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn user_overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<UserOverview>>, ServiceError> {
    Ok(respond(
        state.services.dashboard.user_overview(user.user_id).await,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(admin_overview))
}

pub fn home_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(user_overview))
}
