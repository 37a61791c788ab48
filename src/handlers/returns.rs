use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{respond_page, respond_unit};
use crate::auth::AuthenticatedUser;
use crate::db::filter::ListParams;
use crate::errors::ServiceError;
use crate::services::returns::ReturnRow;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReturnDecisionRequest {
    /// approved or rejected
    pub admin_status: String,
}

#[utoipa::path(
    get,
    path = "/admin/returns/new",
    params(ListParams),
    responses((status = 200, description = "Vendor-approved returns awaiting decision")),
    security(("bearer_auth" = [])),
    tag = "Returns"
)]
pub async fn list_new_returns(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<ReturnRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_page(state.services.returns.find_new(&params).await))
}

#[utoipa::path(
    get,
    path = "/admin/returns/history",
    params(ListParams),
    responses((status = 200, description = "Decided returns")),
    security(("bearer_auth" = [])),
    tag = "Returns"
)]
pub async fn list_return_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<ReturnRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_page(
        state.services.returns.find_history(&params).await,
    ))
}

#[utoipa::path(
    patch,
    path = "/admin/returns/{id}",
    request_body = ReturnDecisionRequest,
    params(("id" = Uuid, Path, description = "Return id")),
    responses((status = 200, description = "Decision recorded")),
    security(("bearer_auth" = [])),
    tag = "Returns"
)]
pub async fn decide_return(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnDecisionRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state
            .services
            .returns
            .decide(id, &request.admin_status)
            .await,
        "Return decision recorded",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/new", get(list_new_returns))
        .route("/history", get(list_return_history))
        .route("/:id", patch(decide_return))
}
