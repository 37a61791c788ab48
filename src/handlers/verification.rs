use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{respond, respond_message, respond_page, respond_unit};
use crate::auth::AuthenticatedUser;
use crate::db::filter::ListParams;
use crate::entities::user_document;
use crate::errors::ServiceError;
use crate::services::verification::{DocumentUpload, VerificationDetail, VerificationRow};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RoleFilter {
    /// logistic_agent or logistic_manager; both when absent
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DocumentDecisionRequest {
    pub document_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/admin/logistics-verification",
    params(RoleFilter, ListParams),
    responses((status = 200, description = "Verification queue")),
    security(("bearer_auth" = [])),
    tag = "Logistics"
)]
pub async fn list_verifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(role): Query<RoleFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<VerificationRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_page(
        state
            .services
            .verification
            .find_all(role.role.as_deref(), &params)
            .await,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/logistics-verification/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Verification detail")),
    security(("bearer_auth" = [])),
    tag = "Logistics"
)]
pub async fn get_verification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VerificationDetail>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.verification.find_one(id).await))
}

/// Multipart intake: each file part is named with its document type.
#[utoipa::path(
    post,
    path = "/admin/logistics-verification/{id}/documents",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Documents uploaded")),
    security(("bearer_auth" = [])),
    tag = "Logistics"
)]
pub async fn upload_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<user_document::Model>>>, ServiceError> {
    user.require_admin()?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let document_type = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("failed reading upload: {e}")))?;

        uploads.push(DocumentUpload {
            document_type,
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(respond_message(
        state.services.verification.upload_documents(id, uploads).await,
        "Files uploaded successfully",
    ))
}

#[utoipa::path(
    patch,
    path = "/admin/logistics-verification/{id}/approve-document",
    request_body = DocumentDecisionRequest,
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Document approved")),
    security(("bearer_auth" = [])),
    tag = "Logistics"
)]
pub async fn approve_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DocumentDecisionRequest>,
) -> Result<Json<ApiResponse<user_document::Model>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_message(
        state
            .services
            .verification
            .approve_document(id, request.document_id)
            .await,
        "Document approved successfully",
    ))
}

#[utoipa::path(
    patch,
    path = "/admin/logistics-verification/{id}/reject-document",
    request_body = DocumentDecisionRequest,
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Document rejected")),
    security(("bearer_auth" = [])),
    tag = "Logistics"
)]
pub async fn reject_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DocumentDecisionRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state
            .services
            .verification
            .reject_document(id, request.document_id)
            .await,
        "Document rejected and deleted successfully",
    ))
}

#[utoipa::path(
    patch,
    path = "/admin/logistics-verification/{id}/verify",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User verified")),
    security(("bearer_auth" = [])),
    tag = "Logistics"
)]
pub async fn verify_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state.services.verification.verify(id).await,
        "Logistics user verified successfully",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_verifications))
        .route("/:id", get(get_verification))
        .route("/:id/documents", post(upload_documents))
        .route("/:id/approve-document", patch(approve_document))
        .route("/:id/reject-document", patch(reject_document))
        .route("/:id/verify", patch(verify_user))
}
