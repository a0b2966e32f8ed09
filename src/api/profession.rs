use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::location::{ListQuery, NameRequest};
use crate::api::middleware::auth::{require_auth, AuthenticatedUser};
use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::profession::Profession;
use crate::services::{catalog, providers};

#[derive(Debug, Deserialize)]
struct LinkRequest {
    /// Profession name or id
    profession: String,
}

async fn list_professions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Profession>>> {
    let professions =
        catalog::list::<Profession>(&state.pool, query.q.as_deref(), query.limit()).await?;
    Ok(Json(professions))
}

async fn find_or_create_profession(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NameRequest>,
) -> Result<(StatusCode, Json<Profession>)> {
    let resolved = catalog::find_or_create::<Profession>(&state.pool, &req.name).await?;

    let status = if resolved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(resolved.entry)))
}

/// Links a profession (created on the fly) to the caller's provider profile
async fn link_profession(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<LinkRequest>,
) -> Result<Json<Profession>> {
    let profession = providers::link_profession(&state.pool, user.user_id, &req.profession).await?;
    Ok(Json(profession))
}

async fn unlink_profession(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(profession_id): ApiPath<i32>,
) -> Result<StatusCode> {
    providers::unlink_profession(&state.pool, user.user_id, profession_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_own_professions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Profession>>> {
    let professions = providers::list_own_professions(&state.pool, user.user_id).await?;
    Ok(Json(professions))
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/profession/link", post(link_profession))
        .route("/profession/link/:profession_id", delete(unlink_profession))
        .route("/profession/mine", get(list_own_professions))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route(
            "/profession",
            get(list_professions).post(find_or_create_profession),
        )
        .merge(protected)
}
