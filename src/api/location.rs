use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::city::City;
use crate::services::catalog;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

/// Lists known cities
async fn list_cities(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<City>>> {
    let cities = catalog::list::<City>(&state.pool, query.q.as_deref(), query.limit()).await?;
    Ok(Json(cities))
}

/// Finds a city by name or id, creating it when unknown
async fn find_or_create_city(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NameRequest>,
) -> Result<(StatusCode, Json<City>)> {
    let resolved = catalog::find_or_create::<City>(&state.pool, &req.name).await?;

    let status = if resolved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(resolved.entry)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/location", get(list_cities).post(find_or_create_city))
}
