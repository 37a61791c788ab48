use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::entities::order;
use crate::errors::ServiceError;
use crate::services::orders::OrderListRow;
use crate::{ApiResponse, AppState};

/// Live-show orders have a dedicated screen, so the default admin list
/// hides that category.
const LIVE_SHOW_CATEGORY: &str = "Live Show";

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct OrderListFilter {
    /// Include every category, live shows included
    #[serde(default)]
    pub all_categories: bool,
}

#[utoipa::path(
    get,
    path = "/admin/orders",
    params(OrderListFilter),
    responses((status = 200, description = "List orders")),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<OrderListFilter>,
) -> Result<Json<ApiResponse<Vec<OrderListRow>>>, ServiceError> {
    user.require_admin()?;
    let exclude = (!filter.all_categories).then_some(LIVE_SHOW_CATEGORY);
    Ok(respond(state.services.orders.find_all(exclude).await))
}

#[utoipa::path(
    get,
    path = "/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses((status = 200, description = "Order detail")),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.orders.find_by_id(id).await))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
}
