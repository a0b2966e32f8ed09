use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::auth::{require_auth, AuthenticatedUser};
use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::provider::ProviderCard;
use crate::services::providers::{self, ProfileInput, SearchPage, SearchParams};

#[derive(Debug, Deserialize)]
struct SearchQuery {
    profession: Option<String>,
    city: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UpdateProviderRequest {
    bio: Option<String>,
    experience_years: Option<i32>,
    hourly_rate: Option<i32>,
    is_available: Option<bool>,
    city: Option<String>,
}

/// Search providers by profession and/or city
async fn search_providers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<SearchPage>> {
    let page = providers::search(
        &state.pool,
        &SearchParams {
            profession: query.profession,
            city: query.city,
            page: query.page,
            limit: query.limit,
        },
    )
    .await?;

    Ok(Json(page))
}

async fn get_provider(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ProviderCard>> {
    Ok(Json(providers::get_card(&state.pool, id).await?))
}

async fn get_own_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ProviderCard>> {
    Ok(Json(providers::get_own_card(&state.pool, user.user_id).await?))
}

/// Create or update the caller's provider profile
async fn upsert_own_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<UpdateProviderRequest>,
) -> Result<Json<ProviderCard>> {
    let card = providers::upsert_profile(
        &state.pool,
        user.user_id,
        ProfileInput {
            bio: req.bio,
            experience_years: req.experience_years,
            hourly_rate: req.hourly_rate,
            is_available: req.is_available,
            city: req.city,
        },
    )
    .await?;

    Ok(Json(card))
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/providers/me", get(get_own_profile).put(upsert_own_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/providers/search", get(search_providers))
        .route("/providers/:id", get(get_provider))
        .merge(protected)
}
