use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{respond, respond_message, respond_unit};
use crate::auth::AuthenticatedUser;
use crate::entities::checkout;
use crate::errors::ServiceError;
use crate::services::checkout::{CheckoutDetail, UpdateCheckoutRequest};
use crate::services::pricing::CouponEffect;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ApplyCouponRequest {
    pub code: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RemoveCouponRequest {
    pub coupon_id: Uuid,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub total: Decimal,
    pub coupons: Vec<CouponEffect>,
}

#[utoipa::path(
    post,
    path = "/checkout",
    responses((status = 200, description = "Checkout created from the cart")),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<checkout::Model>>, ServiceError> {
    Ok(respond_message(
        state.services.checkout.create(user.user_id).await,
        "Checkout created successfully.",
    ))
}

#[utoipa::path(
    patch,
    path = "/checkout/{id}",
    request_body = UpdateCheckoutRequest,
    params(("id" = Uuid, Path, description = "Checkout id")),
    responses((status = 200, description = "Checkout updated")),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn update_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCheckoutRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    Ok(respond_unit(
        state
            .services
            .checkout
            .update(id, user.user_id, request)
            .await,
        "Checkout updated successfully.",
    ))
}

#[utoipa::path(
    get,
    path = "/checkout/{id}",
    params(("id" = Uuid, Path, description = "Checkout id")),
    responses((status = 200, description = "Checkout detail")),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn get_checkout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CheckoutDetail>>, ServiceError> {
    Ok(respond(state.services.checkout.find_one(id).await))
}

/// Subtotal, coupon effects and the payable total for a checkout.
#[utoipa::path(
    get,
    path = "/checkout/{id}/total",
    params(("id" = Uuid, Path, description = "Checkout id")),
    responses((status = 200, description = "Checkout totals")),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn get_checkout_total(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CheckoutTotals>>, ServiceError> {
    let pricing = &state.services.pricing;
    let result = async {
        Ok(CheckoutTotals {
            subtotal: pricing.subtotal(id).await?,
            total: pricing.total(id).await?,
            coupons: pricing.coupons(id).await?,
        })
    }
    .await;
    Ok(respond(result))
}

#[utoipa::path(
    post,
    path = "/checkout/{id}/apply-coupon",
    request_body = ApplyCouponRequest,
    params(("id" = Uuid, Path, description = "Checkout id")),
    responses((status = 200, description = "Coupon applied")),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn apply_coupon(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<ApiResponse<Vec<CouponEffect>>>, ServiceError> {
    Ok(respond_message(
        state
            .services
            .checkout
            .apply_coupon(user.user_id, id, &request.code)
            .await,
        "Coupon applied successfully",
    ))
}

#[utoipa::path(
    post,
    path = "/checkout/{id}/remove-coupon",
    request_body = RemoveCouponRequest,
    params(("id" = Uuid, Path, description = "Checkout id")),
    responses((status = 200, description = "Coupon removed")),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn remove_coupon(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RemoveCouponRequest>,
) -> Result<Json<ApiResponse<Vec<CouponEffect>>>, ServiceError> {
    Ok(respond_message(
        state
            .services
            .checkout
            .remove_coupon(user.user_id, id, request.coupon_id)
            .await,
        "Coupon removed successfully",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_checkout))
        .route("/:id", get(get_checkout).patch(update_checkout))
        .route("/:id/total", get(get_checkout_total))
        .route("/:id/apply-coupon", post(apply_coupon))
        .route("/:id/remove-coupon", post(remove_coupon))
}
