use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{respond_message, respond_page, respond_unit};
use crate::auth::AuthenticatedUser;
use crate::db::filter::ListParams;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::services::staff::{AddStaffRequest, StaffRow};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct StaffFilter {
    /// vendor or logistics (default logistics)
    #[serde(rename = "type")]
    pub staff_type: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SetRoleRequest {
    pub role: String,
}

#[utoipa::path(
    get,
    path = "/admin/staff",
    params(StaffFilter, ListParams),
    responses((status = 200, description = "List staff with computed metrics")),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_staff(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<StaffFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<StaffRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_page(
        state
            .services
            .staff
            .find_all(filter.staff_type.as_deref(), &params)
            .await,
    ))
}

#[utoipa::path(
    post,
    path = "/admin/staff",
    request_body = AddStaffRequest,
    responses((status = 200, description = "Staff account created")),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn add_staff(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddStaffRequest>,
) -> Result<Json<ApiResponse<user::Model>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_message(
        state.services.staff.add_user(request).await,
        "User created successfully",
    ))
}

#[utoipa::path(
    patch,
    path = "/admin/staff/{id}/role",
    request_body = SetRoleRequest,
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Role updated")),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn set_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state.services.staff.set_role(id, &request.role).await,
        "Role updated successfully",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_staff).post(add_staff))
        .route("/:id/role", patch(set_role))
}
