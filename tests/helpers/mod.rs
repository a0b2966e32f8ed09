// Shared state and request builders for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
};
use chrono::Duration;
use serde_json::Value;
use sqlx::PgPool;

use profinder::api::middleware::session::AppState;
use profinder::config::Config;
use profinder::services::{mailer::Mailer, otp::OtpStore, tokens::TokenService};

pub const ACCESS_SECRET: &str = "test-access-secret-test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret-test-refresh-secret";

pub fn test_config() -> Config {
    let settings = config::Config::builder()
        .set_override("database_url", "postgres://localhost/profinder_test")
        .unwrap()
        .set_override("jwt_access_secret", ACCESS_SECRET)
        .unwrap()
        .set_override("jwt_refresh_secret", REFRESH_SECRET)
        .unwrap()
        .set_override("bcrypt_cost", 4)
        .unwrap()
        .set_override("cookie_secure", false)
        .unwrap()
        .build()
        .unwrap();

    Config::from_settings(&settings).unwrap()
}

/// Application state over the given pool, with mail only logged
pub fn test_state(pool: PgPool) -> AppState {
    let config = test_config();

    AppState {
        pool,
        tokens: TokenService::from_config(&config),
        otp: OtpStore::new(
            Duration::minutes(config.otp_ttl_minutes),
            config.otp_max_attempts,
        ),
        mailer: Arc::new(Mailer::Log {
            from: config.mail_from.parse().unwrap(),
        }),
        config,
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
