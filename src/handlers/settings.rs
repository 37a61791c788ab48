use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::settings::NotificationSettings;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateNotificationSettingsRequest {
    /// Flag name → enabled
    pub flags: BTreeMap<String, bool>,
}

#[utoipa::path(
    get,
    path = "/settings/notifications",
    responses((status = 200, description = "Notification preferences")),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_notification_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<NotificationSettings>>, ServiceError> {
    Ok(respond(
        state
            .services
            .settings
            .notification_settings(user.user_id)
            .await,
    ))
}

#[utoipa::path(
    patch,
    path = "/settings/notifications",
    request_body = UpdateNotificationSettingsRequest,
    responses((status = 200, description = "Preferences updated")),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_notification_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateNotificationSettingsRequest>,
) -> Result<Json<ApiResponse<NotificationSettings>>, ServiceError> {
    Ok(respond(
        state
            .services
            .settings
            .update_notification_settings(user.user_id, request.flags)
            .await,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/notifications",
        get(get_notification_settings).patch(update_notification_settings),
    )
}
