use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{respond, respond_page};
use crate::auth::AuthenticatedUser;
use crate::db::filter::ListParams;
use crate::errors::ServiceError;
use crate::services::payroll::PayrollRow;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PayrollFilter {
    /// `logistics` switches from vendor payouts to logistics staff
    #[serde(rename = "type")]
    pub staff_type: Option<String>,
}

#[utoipa::path(
    get,
    path = "/admin/payroll",
    params(PayrollFilter, ListParams),
    responses((status = 200, description = "List payouts")),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payroll(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<PayrollFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<PayrollRow>>>, ServiceError> {
    user.require_admin()?;
    Ok(respond_page(
        state
            .services
            .payroll
            .find_all(filter.staff_type.as_deref(), &params)
            .await,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/payroll/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses((status = 200, description = "Payout detail")),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PayrollRow>>, ServiceError> {
    user.require_admin()?;
    Ok(respond(state.services.payroll.get_transaction(id).await))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payroll))
        .route("/:id", get(get_payroll_transaction))
}
