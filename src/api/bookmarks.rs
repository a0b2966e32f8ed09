use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::api::middleware::auth::{require_auth, AuthenticatedUser};
use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::{bookmark::Bookmark, provider::ProviderCard};
use crate::services::bookmarks;

#[derive(Debug, Deserialize)]
struct CreateBookmarkRequest {
    provider_id: Uuid,
}

async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<ProviderCard>>> {
    Ok(Json(bookmarks::list(&state.pool, user.user_id).await?))
}

async fn add_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>)> {
    let (bookmark, created) = bookmarks::add(&state.pool, user.user_id, req.provider_id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(bookmark)))
}

async fn remove_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(provider_id): ApiPath<Uuid>,
) -> Result<StatusCode> {
    bookmarks::remove(&state.pool, user.user_id, provider_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(list_bookmarks).post(add_bookmark))
        .route("/bookmarks/:provider_id", delete(remove_bookmark))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
