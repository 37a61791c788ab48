use axum::{extract::State, routing::get, Json, Router};

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::clients::ClientRow;
use crate::services::payment_history::PaymentHistoryRow;
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/admin/clients",
    responses((status = 200, description = "List customer accounts")),
    security(("bearer_auth" = [])),
    tag = "Clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<ClientRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.clients.find_all().await))
}

#[utoipa::path(
    get,
    path = "/admin/payment-history",
    responses((status = 200, description = "List payment transactions")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payment_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<PaymentHistoryRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.payment_history.find_all().await))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_clients))
}

pub fn payment_history_routes() -> Router<AppState> {
    Router::new().route("/", get(list_payment_history))
}
