use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::session::AppState;
use crate::models::UserRole;

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Authentication required. Please log in.",
            AuthError::InvalidToken => "Invalid or expired access token.",
        };

        let body = Json(json!({
            "code": "UNAUTHORIZED",
            "message": message,
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extension type that holds the authenticated user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Middleware that requires a valid `Bearer` access token
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let claims = state.tokens.verify_access(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AuthError::InvalidToken
    })?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&request_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&request_with(Some("bearer abc"))), Some("abc"));
    }

    #[test]
    fn test_bearer_token_missing_or_wrong_scheme() {
        assert_eq!(bearer_token(&request_with(None)), None);
        assert_eq!(bearer_token(&request_with(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&request_with(Some("Bearer "))), None);
    }
}
