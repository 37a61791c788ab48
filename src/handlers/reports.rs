use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::common::{respond, respond_page};
use crate::auth::AuthenticatedUser;
use crate::db::filter::ListParams;
use crate::entities::report;
use crate::errors::ServiceError;
use crate::services::reports::{CreateReportRequest, ReportPayload};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    post,
    path = "/admin/reports",
    request_body = CreateReportRequest,
    responses((status = 200, description = "Report generated")),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn create_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReportRequest>,
) -> Result<Json<ApiResponse<ReportPayload>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.reports.create(request).await))
}

#[utoipa::path(
    get,
    path = "/admin/reports",
    params(ListParams),
    responses((status = 200, description = "List report records")),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<report::Model>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_page(state.services.reports.find_all(&params).await))
}

#[utoipa::path(
    get,
    path = "/admin/reports/{id}",
    params(("id" = Uuid, Path, description = "Report id")),
    responses((status = 200, description = "Report record")),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<report::Model>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.reports.find_one(id).await))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_report).get(list_reports))
        .route("/:id", get(get_report))
}
