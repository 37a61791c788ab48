//! Marketplace administration API library.
//!
//! Thin axum handlers delegate to services that build typed query
//! filters, talk to the database through sea-orm, and shape the uniform
//! `{success, data|message, pagination?}` envelope.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod payments;
pub mod repositories;
pub mod services;
pub mod storage;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::db::filter::{Page, Pagination};

/// Shared application state, built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub storage: Arc<dyn storage::ObjectStorage>,
}

/// Uniform response envelope. Callers inspect `success`; most admin
/// endpoints return HTTP 200 either way.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            pagination: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn page(page: Page<T>) -> Self {
        Self {
            success: true,
            data: Some(page.data),
            message: None,
            pagination: Some(page.pagination),
        }
    }
}

#[cfg(test)]
mod envelope_tests {
    use super::*;

    #[test]
    fn success_envelope_has_data_and_no_message() {
        let response = ApiResponse::success(vec![1, 2, 3]);
        assert!(response.success);
        assert_eq!(response.data, Some(vec![1, 2, 3]));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_envelope_drops_data() {
        let response = ApiResponse::<()>::error("boom");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("boom"));
    }

    #[test]
    fn page_envelope_carries_pagination() {
        let page = Page {
            pagination: Pagination::new(2, 10, 35),
            data: vec!["row"],
        };
        let response = ApiResponse::page(page);
        let pagination = response.pagination.expect("pagination");
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.total_pages, 4);
        assert_eq!(pagination.total_items, 35);
    }
}
