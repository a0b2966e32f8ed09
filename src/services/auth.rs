use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::api::middleware::session::AppState;
use crate::error::{is_unique_violation, AppError};
use crate::models::{
    provider::Provider,
    refresh_token::RefreshToken,
    user::{CreateUserData, PublicUser, User, UserRole},
};
use crate::services::normalize::{collapse_whitespace, normalize_email, normalize_phone};
use crate::services::otp::OtpPurpose;
use crate::services::password::{
    hash_password, validate_password, verify_dummy_password, verify_password,
};
use crate::services::tokens::{hash_refresh_token, TokenPair, TokenService};

const MAX_NAME_LEN: usize = 100;

/// A logged-in user with a freshly issued token pair
#[derive(Debug)]
pub struct AuthSession {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// JSON body returned by register, login and refresh
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: PublicUser,
}

impl AuthSession {
    pub fn to_response(&self, access_ttl_secs: i64) -> AuthResponse {
        AuthResponse {
            access_token: self.tokens.access.token.clone(),
            token_type: "Bearer",
            expires_in: access_ttl_secs,
            refresh_token: self.tokens.refresh.token.clone(),
            user: self.user.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: Option<UserRole>,
}

/// Validates and normalizes a display name for a person.
pub fn validate_full_name(input: &str) -> Result<String, AppError> {
    let name = collapse_whitespace(input);
    if name.is_empty() {
        return Err(AppError::Validation("Full name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Full name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}

pub fn validate_email(input: &str) -> Result<String, AppError> {
    normalize_email(input).ok_or_else(|| AppError::Validation("Invalid email address".to_string()))
}

/// Normalizes an optional phone number; blank input means "no phone".
pub fn validate_phone(input: Option<&str>) -> Result<Option<String>, AppError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => normalize_phone(raw)
            .map(Some)
            .ok_or_else(|| AppError::Validation("Invalid phone number".to_string())),
    }
}

/// Maps unique violations on the users table to readable conflicts.
pub fn map_user_conflict(error: sqlx::Error) -> AppError {
    if is_unique_violation(&error, "users_email_key") {
        AppError::Conflict("Email is already registered".to_string())
    } else if is_unique_violation(&error, "users_phone_key") {
        AppError::Conflict("Phone number is already registered".to_string())
    } else {
        AppError::Database(error)
    }
}

#[tracing::instrument(skip(state, input), fields(email = %input.email))]
pub async fn register(state: &AppState, input: RegisterInput) -> Result<AuthSession, AppError> {
    let full_name = validate_full_name(&input.full_name)?;
    let email = validate_email(&input.email)?;
    let phone = validate_phone(input.phone.as_deref())?;
    validate_password(&input.password)?;

    let role = input.role.unwrap_or(UserRole::Customer);
    let password_hash = hash_password(&input.password, state.config.bcrypt_cost).await?;

    let mut tx = state.pool.begin().await?;

    let user = User::create(
        &mut *tx,
        &CreateUserData {
            full_name,
            email,
            phone,
            password_hash,
            role,
        },
    )
    .await
    .map_err(map_user_conflict)?;

    if role == UserRole::Provider {
        Provider::create(&mut *tx, user.id).await?;
    }

    let session = issue_session(&mut *tx, &state.tokens, &user).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, role = %role, "User registered");

    Ok(session)
}

#[tracing::instrument(skip(state, password))]
pub async fn login(state: &AppState, identifier: &str, password: &str) -> Result<AuthSession, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = if identifier.contains('@') {
        match normalize_email(identifier) {
            Some(email) => User::find_by_email(&state.pool, &email).await?,
            None => None,
        }
    } else {
        match normalize_phone(identifier) {
            Some(phone) => User::find_by_phone(&state.pool, &phone).await?,
            None => None,
        }
    };

    let Some(user) = user else {
        verify_dummy_password(password, state.config.bcrypt_cost).await?;
        tracing::info!("Login failed: unknown identifier");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "User logged in");

    issue_session(&state.pool, &state.tokens, &user).await
}

/// Exchanges a refresh token for a new pair, revoking the presented one.
pub async fn refresh(state: &AppState, token: &str) -> Result<AuthSession, AppError> {
    let invalid = || AppError::Unauthorized("Invalid refresh token".to_string());

    let claims = state.tokens.verify_refresh(token).map_err(|e| {
        tracing::debug!(error = %e, "Refresh token failed verification");
        invalid()
    })?;

    let stored = RefreshToken::find_by_hash(&state.pool, &hash_refresh_token(token))
        .await?
        .ok_or_else(invalid)?;

    if stored.user_id != claims.sub {
        return Err(invalid());
    }

    if stored.is_revoked() {
        // A rotated token came back: assume it leaked and end every session
        let revoked = RefreshToken::revoke_all_for_user(&state.pool, stored.user_id).await?;
        tracing::warn!(
            user_id = %stored.user_id,
            revoked,
            "Refresh token reuse detected, all sessions revoked"
        );
        return Err(invalid());
    }

    if stored.is_expired() {
        return Err(invalid());
    }

    let user = User::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(invalid)?;

    // Revocation and the replacement token commit together
    let mut tx = state.pool.begin().await?;

    if !RefreshToken::revoke(&mut *tx, stored.id).await? {
        // Another request rotated this token first
        RefreshToken::revoke_all_for_user(&mut *tx, stored.user_id).await?;
        tx.commit().await?;
        tracing::warn!(user_id = %stored.user_id, "Concurrent refresh detected, all sessions revoked");
        return Err(invalid());
    }

    let session = issue_session(&mut *tx, &state.tokens, &user).await?;
    tx.commit().await?;

    tracing::debug!(user_id = %user.id, "Refresh token rotated");

    Ok(session)
}

/// Revokes the presented refresh token, if it is known.
pub async fn logout(state: &AppState, token: Option<&str>) -> Result<(), AppError> {
    let Some(token) = token else {
        return Ok(());
    };

    if let Some(stored) = RefreshToken::find_by_hash(&state.pool, &hash_refresh_token(token)).await? {
        RefreshToken::revoke(&state.pool, stored.id).await?;
        tracing::info!(user_id = %stored.user_id, "User logged out");
    }

    Ok(())
}

/// Sends a password reset code when the email belongs to a user. Unknown
/// emails are silently ignored so callers cannot probe for accounts.
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = validate_email(email)?;

    let Some(user) = User::find_by_email(&state.pool, &email).await? else {
        tracing::info!("Password reset requested for unknown email");
        return Ok(());
    };

    let code = state.otp.generate(&user.email, OtpPurpose::PasswordReset)?;

    if let Err(e) = state
        .mailer
        .send_otp(
            &user.email,
            &user.full_name,
            OtpPurpose::PasswordReset,
            &code,
            state.otp.ttl().num_minutes(),
        )
        .await
    {
        tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        state.otp.invalidate(&user.email, OtpPurpose::PasswordReset);
    }

    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    email: &str,
    otp: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let email = validate_email(email)?;
    validate_password(new_password)?;

    state.otp.validate(&email, OtpPurpose::PasswordReset, otp)?;

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    set_password_and_revoke_sessions(state, user.id, new_password).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(())
}

pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(current_password, &user.password_hash).await? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_password(new_password)?;
    if current_password == new_password {
        return Err(AppError::Validation(
            "New password must differ from the current one".to_string(),
        ));
    }

    set_password_and_revoke_sessions(state, user.id, new_password).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(())
}

pub async fn request_email_verification(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Err(AppError::Conflict("Email is already verified".to_string()));
    }

    let code = state.otp.generate(&user.email, OtpPurpose::EmailVerification)?;

    if let Err(e) = state
        .mailer
        .send_otp(
            &user.email,
            &user.full_name,
            OtpPurpose::EmailVerification,
            &code,
            state.otp.ttl().num_minutes(),
        )
        .await
    {
        state.otp.invalidate(&user.email, OtpPurpose::EmailVerification);
        return Err(e.into());
    }

    tracing::info!(user_id = %user.id, "Email verification code sent");
    Ok(())
}

pub async fn confirm_email_verification(
    state: &AppState,
    user_id: Uuid,
    otp: &str,
) -> Result<(), AppError> {
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Err(AppError::Conflict("Email is already verified".to_string()));
    }

    state
        .otp
        .validate(&user.email, OtpPurpose::EmailVerification, otp)?;

    User::mark_email_verified(&state.pool, user.id).await?;

    tracing::info!(user_id = %user.id, "Email verified");
    Ok(())
}

async fn set_password_and_revoke_sessions(
    state: &AppState,
    user_id: Uuid,
    new_password: &str,
) -> Result<(), AppError> {
    let password_hash = hash_password(new_password, state.config.bcrypt_cost).await?;

    let mut tx = state.pool.begin().await?;
    User::update_password(&mut *tx, user_id, &password_hash).await?;
    RefreshToken::revoke_all_for_user(&mut *tx, user_id).await?;
    tx.commit().await?;

    Ok(())
}

/// Signs a token pair and stores the refresh token hash.
async fn issue_session<'e, E>(
    executor: E,
    tokens: &TokenService,
    user: &User,
) -> Result<AuthSession, AppError>
where
    E: PgExecutor<'e>,
{
    let pair = tokens.issue_pair(user.id, user.role())?;

    RefreshToken::create(
        executor,
        user.id,
        &hash_refresh_token(&pair.refresh.token),
        pair.refresh.expires_at,
    )
    .await?;

    Ok(AuthSession {
        user: user.to_public(),
        tokens: pair,
    })
}
