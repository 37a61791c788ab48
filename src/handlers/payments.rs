use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::common::respond;
use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::payments::stripe::construct_event;
use crate::services::payments::{
    PlanPaymentRequest, PlanPaymentResponse, SubscriptionRequest, SubscriptionResponse,
};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub price_id: String,
}

#[utoipa::path(
    post,
    path = "/payment/stripe/plan-payment",
    responses((status = 200, description = "Payment initiated and confirmed when possible")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_plan_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<PlanPaymentRequest>,
) -> Result<Json<ApiResponse<PlanPaymentResponse>>, ServiceError> {
    Ok(respond(
        state
            .services
            .payments
            .create_plan_payment(user.user_id, request)
            .await,
    ))
}

#[utoipa::path(
    post,
    path = "/payment/stripe/subscription",
    responses((status = 200, description = "Subscription created")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<ApiResponse<SubscriptionResponse>>, ServiceError> {
    Ok(respond(
        state.services.payments.create_subscription(request).await,
    ))
}

#[utoipa::path(
    post,
    path = "/payment/stripe/subscription/{id}/cancel",
    params(("id" = String, Path, description = "Subscription id")),
    responses((status = 200, description = "Subscription canceled")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SubscriptionResponse>>, ServiceError> {
    Ok(respond(
        state.services.payments.cancel_subscription(&id).await,
    ))
}

#[utoipa::path(
    post,
    path = "/payment/stripe/subscription/{id}",
    request_body = UpdateSubscriptionRequest,
    params(("id" = String, Path, description = "Subscription id")),
    responses((status = 200, description = "Subscription updated")),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<Json<ApiResponse<SubscriptionResponse>>, ServiceError> {
    Ok(respond(
        state
            .services
            .payments
            .update_subscription(&id, &request.price_id)
            .await,
    ))
}

/// Provider callback. Signature verification happens before anything is
/// parsed; a verified event is acknowledged with 200 whether or not the
/// event type is recognized.
#[utoipa::path(
    post,
    path = "/payment/stripe/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Missing or invalid signature")
    ),
    tag = "Payments"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "received": false, "error": "No signature found" })),
        );
    };

    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "received": false, "error": "No raw body found" })),
        );
    }

    let event = match construct_event(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        state.config.webhook_tolerance_secs,
        Utc::now().timestamp(),
    ) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "webhook rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "received": false, "error": err.to_string() })),
            );
        }
    };

    if let Err(err) = state.services.payments.apply_webhook_event(&event).await {
        warn!(error = %err, "webhook handling failed");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "received": false, "error": err.to_string() })),
        );
    }

    (StatusCode::OK, Json(json!({ "received": true })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/plan-payment", post(create_plan_payment))
        .route("/subscription", post(create_subscription))
        .route("/subscription/:id", post(update_subscription))
        .route("/subscription/:id/cancel", post(cancel_subscription))
        .route("/webhook", post(stripe_webhook))
}
