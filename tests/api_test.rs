// Router-level tests that never reach the database.
// The pool connects lazily, so every request here must be rejected before a query runs.

mod helpers;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use helpers::{body_json, empty_request, json_request, test_config, test_state};
use profinder::api::middleware::session::AppState;
use profinder::models::UserRole;

fn test_app() -> (Router, AppState) {
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy(&test_config().database_url)
        .unwrap();
    let state = test_state(pool);

    (profinder::api::app(state.clone()), state)
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = test_app();

    let response = app
        .oneshot(empty_request(Method::GET, "/users/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_protected_route_rejects_garbage_token() {
    let (app, _) = test_app();

    let response = app
        .oneshot(empty_request(Method::GET, "/bookmarks", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_not_accepted_as_access_token() {
    let (app, state) = test_app();
    let pair = state
        .tokens
        .issue_pair(Uuid::new_v4(), UserRole::Customer)
        .unwrap();

    let response = app
        .oneshot(empty_request(
            Method::GET,
            "/providers/me",
            Some(&pair.refresh.token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_token_is_unauthorized() {
    let (app, _) = test_app();

    let response = app
        .oneshot(Request::post("/auth/refresh").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_access_token_is_unauthorized() {
    let (app, state) = test_app();
    let pair = state
        .tokens
        .issue_pair(Uuid::new_v4(), UserRole::Customer)
        .unwrap();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/auth/refresh",
            None,
            &json!({ "refresh_token": pair.access.token }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_unusable_identifier_is_unauthorized() {
    let (app, _) = test_app();

    // Neither an email nor a phone number, so no lookup happens
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/auth/login",
            None,
            &json!({ "identifier": "nobody", "password": "whatever 1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let (app, _) = test_app();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/auth/register",
            None,
            &json!({
                "full_name": "Ada Lovelace",
                "email": "not-an-email",
                "password": "correct horse 1",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let (app, _) = test_app();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/auth/register",
            None,
            &json!({
                "full_name": "Ada Lovelace",
                "email": "ada@example.com",
                "password": "short",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_city_requires_name() {
    let (app, _) = test_app();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/location",
            None,
            &json!({ "name": "   " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "City name is required");
}

#[tokio::test]
async fn test_missing_body_field_renders_json_error() {
    let (app, _) = test_app();

    let response = app
        .oneshot(json_request(Method::POST, "/location", None, &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_malformed_json_renders_json_error() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::post("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_bad_query_value_renders_json_error() {
    let (app, _) = test_app();

    let response = app
        .oneshot(empty_request(
            Method::GET,
            "/providers/search?page=first",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_provider_profile_rejects_negative_experience() {
    let (app, state) = test_app();
    let pair = state
        .tokens
        .issue_pair(Uuid::new_v4(), UserRole::Provider)
        .unwrap();

    let response = app
        .oneshot(json_request(
            Method::PUT,
            "/providers/me",
            Some(&pair.access.token),
            &json!({ "experience_years": -1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_lookup_rejects_malformed_id() {
    let (app, _) = test_app();

    let response = app
        .oneshot(empty_request(Method::GET, "/providers/not-a-uuid", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
}
