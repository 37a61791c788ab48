use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{respond, respond_message, respond_unit};
use crate::auth::AuthenticatedUser;
use crate::entities::category;
use crate::errors::ServiceError;
use crate::services::categories::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CategoryFilter {
    pub q: Option<String>,
    pub status: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses((status = 200, description = "Category created")),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_message(
        state.services.categories.create(request).await,
        "Category created successfully",
    ))
}

#[utoipa::path(
    get,
    path = "/admin/categories",
    params(CategoryFilter),
    responses((status = 200, description = "List categories")),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<ApiResponse<Vec<category::Model>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(
        state
            .services
            .categories
            .find_all(filter.q.as_deref(), filter.status)
            .await,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Category detail")),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.categories.find_one(id).await))
}

#[utoipa::path(
    patch,
    path = "/admin/categories/{id}",
    request_body = UpdateCategoryRequest,
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Category updated")),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state.services.categories.update(id, request).await,
        "Category updated successfully",
    ))
}

#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Category deleted")),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state.services.categories.remove(id).await,
        "Category deleted successfully",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route(
            "/:id",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}
