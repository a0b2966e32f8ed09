use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::extract::ApiJson;
use crate::api::middleware::auth::{require_auth, AuthenticatedUser};
use crate::api::middleware::session::{
    refresh_cookie, removal_cookie, AppState, REFRESH_COOKIE_NAME,
};
use crate::error::{AppError, Result};
use crate::models::UserRole;
use crate::services::auth::{self as auth_service, AuthSession, RegisterInput};

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    full_name: String,
    email: String,
    phone: Option<String>,
    password: String,
    role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    /// Email address or phone number
    identifier: String,
    password: String,
}

#[derive(Debug, Deserialize, Default)]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    email: String,
    otp: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmEmailRequest {
    otp: String,
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

/// Sets the refresh cookie and renders the token body
fn session_response(
    state: &AppState,
    jar: CookieJar,
    status: StatusCode,
    session: AuthSession,
) -> impl IntoResponse {
    let body = session.to_response(state.tokens.access_ttl().num_seconds());
    let jar = jar.add(refresh_cookie(state, session.tokens.refresh.token));
    (status, jar, Json(body))
}

/// Body token wins over the cookie so non-browser clients can refresh
fn presented_refresh_token(jar: &CookieJar, body: Option<RefreshRequest>) -> Option<String> {
    body.and_then(|b| b.refresh_token)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE_NAME).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let session = auth_service::register(
        &state,
        RegisterInput {
            full_name: req.full_name,
            email: req.email,
            phone: req.phone,
            password: req.password,
            role: req.role,
        },
    )
    .await?;

    Ok(session_response(&state, jar, StatusCode::CREATED, session))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let session = auth_service::login(&state, req.identifier.trim(), &req.password).await?;

    Ok(session_response(&state, jar, StatusCode::OK, session))
}

async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse> {
    let token = presented_refresh_token(&jar, body.map(|Json(b)| b))
        .ok_or_else(|| AppError::Unauthorized("Refresh token missing".to_string()))?;

    let session = auth_service::refresh(&state, &token).await?;

    Ok(session_response(&state, jar, StatusCode::OK, session))
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse> {
    let token = presented_refresh_token(&jar, body.map(|Json(b)| b));
    auth_service::logout(&state, token.as_deref()).await?;

    Ok((StatusCode::NO_CONTENT, jar.remove(removal_cookie())))
}

async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<StatusCode> {
    auth_service::request_password_reset(&state, &req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<StatusCode> {
    auth_service::reset_password(&state, &req.email, &req.otp, &req.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn request_email_verification(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    auth_service::request_email_verification(&state, user.user_id).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn confirm_email_verification(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<ConfirmEmailRequest>,
) -> Result<StatusCode> {
    auth_service::confirm_email_verification(&state, user.user_id, &req.otp).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode> {
    auth_service::change_password(&state, user.user_id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates the auth router
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/verify-email/request", post(request_email_verification))
        .route("/auth/verify-email/confirm", post(confirm_email_verification))
        .route("/auth/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn test_body_token_preferred_over_cookie() {
        let jar = CookieJar::new().add(Cookie::new(REFRESH_COOKIE_NAME, "from-cookie"));
        let body = RefreshRequest {
            refresh_token: Some("from-body".to_string()),
        };

        assert_eq!(
            presented_refresh_token(&jar, Some(body)).as_deref(),
            Some("from-body")
        );
    }

    #[test]
    fn test_cookie_used_when_body_empty() {
        let jar = CookieJar::new().add(Cookie::new(REFRESH_COOKIE_NAME, "from-cookie"));

        assert_eq!(
            presented_refresh_token(&jar, Some(RefreshRequest::default())).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            presented_refresh_token(&jar, None).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_no_token_anywhere() {
        assert_eq!(presented_refresh_token(&CookieJar::new(), None), None);
    }
}
