use axum::Json;
use serde::Serialize;

use crate::errors::ServiceError;
use crate::db::filter::Page;
use crate::ApiResponse;

/// Folds a service result into the uniform envelope. Admin endpoints
/// answer HTTP 200 for both outcomes; callers inspect `success`.
pub fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Json<ApiResponse<T>> {
    match result {
        Ok(data) => Json(ApiResponse::success(data)),
        Err(err) => Json(ApiResponse::error(err.to_string())),
    }
}

/// Envelope for operations that report a message instead of data.
pub fn respond_message<T: Serialize>(
    result: Result<T, ServiceError>,
    message: &str,
) -> Json<ApiResponse<T>> {
    match result {
        Ok(data) => Json(ApiResponse::success_with_message(data, message)),
        Err(err) => Json(ApiResponse::error(err.to_string())),
    }
}

/// Envelope for message-only operations.
pub fn respond_unit(result: Result<(), ServiceError>, message: &str) -> Json<ApiResponse<()>> {
    match result {
        Ok(()) => Json(ApiResponse::message(message)),
        Err(err) => Json(ApiResponse::error(err.to_string())),
    }
}

/// Envelope for paginated listings.
pub fn respond_page<T: Serialize>(
    result: Result<Page<T>, ServiceError>,
) -> Json<ApiResponse<Vec<T>>> {
    match result {
        Ok(page) => Json(ApiResponse::page(page)),
        Err(err) => Json(ApiResponse::error(err.to_string())),
    }
}
