use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{respond, respond_unit};
use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::media::{VideoUpload, VideoView};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct MediaFilter {
    pub q: Option<String>,
}

/// Multipart fields: `title`, optional `category`, `file`, optional
/// `thumbnail`.
#[utoipa::path(
    post,
    path = "/admin/videos",
    responses((status = 200, description = "Video uploaded")),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<VideoView>>, ServiceError> {
    user.require_admin()?;

    let mut title = String::new();
    let mut category = None;
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut thumbnail: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
            }
            "category" => {
                category = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServiceError::BadRequest(e.to_string()))?,
                );
            }
            "file" | "thumbnail" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::BadRequest(e.to_string()))?
                    .to_vec();
                if name == "file" {
                    file = Some((file_name, bytes));
                } else {
                    thumbnail = Some((file_name, bytes));
                }
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ServiceError::BadRequest("Missing video file".to_string()))?;

    Ok(respond(
        state
            .services
            .media
            .upload(VideoUpload {
                title,
                category,
                file_name,
                bytes,
                thumbnail,
            })
            .await,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/videos",
    params(MediaFilter),
    responses((status = 200, description = "List videos")),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<MediaFilter>,
) -> Result<Json<ApiResponse<Vec<VideoView>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.media.find_all(filter.q.as_deref()).await))
}

#[utoipa::path(
    delete,
    path = "/admin/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses((status = 200, description = "Video deleted")),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_unit(
        state.services.media.remove(id).await,
        "Video deleted successfully",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_video).get(list_videos))
        .route("/:id", axum::routing::delete(delete_video))
}
