//! Pagination contract over the admin list endpoints, exercised through
//! the logistics verification queue.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};

#[tokio::test]
async fn pagination_reports_ceiling_of_total_over_limit() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin").await;
    for _ in 0..25 {
        app.seed_user("logistic_agent").await;
    }
    let token = app.token_for(admin.id, "admin");

    let response = app
        .request(
            Method::GET,
            "/admin/logistics-verification?page=2&limit=10",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["pagination"]["current_page"], 2);
    assert_eq!(body["pagination"]["total_items"], 25);
    assert_eq!(body["pagination"]["total_pages"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn page_past_the_end_is_empty_with_unchanged_totals() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin").await;
    for _ in 0..5 {
        app.seed_user("logistic_manager").await;
    }
    let token = app.token_for(admin.id, "admin");

    let response = app
        .request(
            Method::GET,
            "/admin/logistics-verification?page=40&limit=10",
            Some(&token),
            None,
        )
        .await;
    let body = response_json(response).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total_items"], 5);
    assert_eq!(body["pagination"]["total_pages"], 1);
}

#[tokio::test]
async fn search_resets_to_the_first_page() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin").await;
    for _ in 0..15 {
        app.seed_user("logistic_agent").await;
    }
    let token = app.token_for(admin.id, "admin");

    // Every seeded agent matches "Test"; the caller asks for page 3 but
    // search pins the listing back to page 1.
    let response = app
        .request(
            Method::GET,
            "/admin/logistics-verification?q=Test&page=3&limit=10",
            Some(&token),
            None,
        )
        .await;
    let body = response_json(response).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn non_admin_callers_are_forbidden() {
    let app = TestApp::new().await;
    let customer = app.seed_user("user").await;
    let token = app.token_for(customer.id, "user");

    let response = app
        .request(
            Method::GET,
            "/admin/logistics-verification",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/admin/logistics-verification", None, None)
        .await;
    assert_eq!(response.status(), 401);
}
