use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::mailer::MailError;
use crate::services::otp::OtpError;
use crate::services::tokens::TokenError;

// PostgreSQL SQLSTATE codes
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_NOT_NULL_VIOLATION: &str = "23502";
const PG_CHECK_VIOLATION: &str = "23514";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Body, path or query string the extractors could not parse
    #[error("Invalid request: {message}")]
    InvalidRequest { status: StatusCode, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps the error to an HTTP status and a machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(e) => database_status(e),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::InvalidRequest { status, .. } => (*status, "INVALID_REQUEST"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Otp(OtpError::TooManyAttempts) => {
                (StatusCode::TOO_MANY_REQUESTS, "OTP_ATTEMPTS_EXCEEDED")
            }
            AppError::Otp(_) => (StatusCode::BAD_REQUEST, "INVALID_OTP"),
            AppError::Token(TokenError::Signing(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            AppError::Token(_) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AppError::Mail(_) => (StatusCode::SERVICE_UNAVAILABLE, "MAIL_UNAVAILABLE"),
            AppError::Password(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    /// User-facing message. Server-side details stay in the logs.
    fn user_message(&self) -> String {
        match self {
            AppError::Database(e) => database_message(e),
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            AppError::InvalidRequest { message, .. } => message.clone(),
            AppError::Otp(e) => e.to_string(),
            AppError::Token(TokenError::Signing(_)) => "Internal server error".to_string(),
            AppError::Token(_) => "Invalid or expired token".to_string(),
            AppError::Mail(_) => "Email delivery is currently unavailable".to_string(),
            AppError::Password(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

fn database_status(error: &sqlx::Error) -> (StatusCode, &'static str) {
    match error {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        sqlx::Error::PoolTimedOut => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(PG_UNIQUE_VIOLATION) => (StatusCode::CONFLICT, "CONFLICT"),
            Some(PG_FOREIGN_KEY_VIOLATION) => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
            Some(PG_NOT_NULL_VIOLATION) | Some(PG_CHECK_VIOLATION) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        },
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
    }
}

fn database_message(error: &sqlx::Error) -> String {
    match database_status(error).1 {
        "NOT_FOUND" => "Resource not found",
        "TIMEOUT" => "The database did not respond in time",
        "CONFLICT" => "A record with the same unique value already exists",
        "INVALID_REFERENCE" => "Referenced record does not exist",
        "VALIDATION_ERROR" => "Invalid or missing field value",
        _ => "Database error",
    }
    .to_string()
}

/// True when the error is a unique-constraint violation on the given constraint.
pub fn is_unique_violation(error: &sqlx::Error, constraint: &str) -> bool {
    match error {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.user_message();

        if status.is_server_error() {
            tracing::error!(error = ?self, code = code, "Request failed");
        } else {
            tracing::debug!(error = %self, code = code, "Request rejected");
        }

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_pass_message_through() {
        let err = AppError::Conflict("Email already registered".to_string());
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "CONFLICT"));
        assert_eq!(err.user_message(), "Email already registered");
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_pool_timeout_maps_to_408() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_and_code(), (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"));
    }

    #[test]
    fn test_other_database_errors_hide_details() {
        let err = AppError::Database(sqlx::Error::Protocol("relation users missing".into()));
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Database error");
    }

    #[test]
    fn test_otp_attempts_exceeded_is_429() {
        let err = AppError::Otp(OtpError::TooManyAttempts);
        assert_eq!(err.status_and_code().0, StatusCode::TOO_MANY_REQUESTS);

        let err = AppError::Otp(OtpError::Expired);
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        let err = AppError::Token(TokenError::Expired);
        assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), "Invalid or expired token");
    }

    #[test]
    fn test_invalid_request_keeps_rejection_status() {
        let err = AppError::InvalidRequest {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `name`".to_string(),
        };
        assert_eq!(
            err.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST")
        );
        assert_eq!(err.user_message(), "missing field `name`");
    }

    #[test]
    fn test_internal_error_message_is_generic() {
        let err = AppError::Internal(anyhow::anyhow!("secret path /etc/profinder"));
        assert_eq!(err.user_message(), "Internal server error");
    }
}
