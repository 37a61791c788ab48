use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::analytics::{CategoryAnalytics, SignupBucket};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PeriodFilter {
    /// "1 month", "6 months" or "1 year"
    pub period: String,
}

#[utoipa::path(
    get,
    path = "/admin/analytics/signups",
    params(PeriodFilter),
    responses((status = 200, description = "User signups bucketed by period")),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn user_signups(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<PeriodFilter>,
) -> Result<Json<ApiResponse<Vec<SignupBucket>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(
        state.services.analytics.user_signups(&filter.period).await,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/analytics/categories",
    params(PeriodFilter),
    responses((status = 200, description = "Order category distribution")),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn order_categories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<PeriodFilter>,
) -> Result<Json<ApiResponse<CategoryAnalytics>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(
        state
            .services
            .analytics
            .order_categories(&filter.period)
            .await,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signups", get(user_signups))
        .route("/categories", get(order_categories))
}
