use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, SameSite};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::mailer::Mailer;
use crate::services::otp::OtpStore;
use crate::services::tokens::TokenService;

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
/// The refresh cookie is only sent to the auth endpoints
pub const REFRESH_COOKIE_PATH: &str = "/auth";

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub tokens: TokenService,
    pub otp: OtpStore,
    pub mailer: Arc<Mailer>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}

/// Builds the HttpOnly cookie holding a freshly issued refresh token
pub fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = time::Duration::seconds(state.tokens.refresh_ttl().num_seconds());

    Cookie::build((REFRESH_COOKIE_NAME, token))
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Strict)
        .path(REFRESH_COOKIE_PATH)
        .max_age(max_age)
        .build()
}

/// Cookie used to remove the refresh token from the browser
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path(REFRESH_COOKIE_PATH)
        .build()
}
