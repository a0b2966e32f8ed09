use axum::{extract::State, middleware, routing::get, Extension, Json, Router};
use serde::Deserialize;

use crate::api::extract::ApiJson;
use crate::api::middleware::auth::{require_auth, AuthenticatedUser};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::user::{PublicUser, User};
use crate::services::auth::{map_user_conflict, validate_full_name, validate_phone};

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    full_name: Option<String>,
    phone: Option<String>,
}

async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<PublicUser>> {
    let user = User::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.to_public()))
}

async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<PublicUser>> {
    let full_name = req.full_name.as_deref().map(validate_full_name).transpose()?;
    let phone = validate_phone(req.phone.as_deref())?;

    let updated = User::update_profile(&state.pool, user.user_id, full_name, phone)
        .await
        .map_err(map_user_conflict)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %updated.id, "Profile updated");

    Ok(Json(updated.to_public()))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).patch(update_me))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
