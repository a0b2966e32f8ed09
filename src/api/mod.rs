// API module - HTTP endpoints

pub mod auth;
pub mod bookmarks;
pub mod extract;
pub mod health;
pub mod location;
pub mod middleware;
pub mod profession;
pub mod providers;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use middleware::session::AppState;

/// Builds the full application router
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .merge(health::router())
        .merge(auth::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(providers::router(state.clone()))
        .merge(location::router())
        .merge(profession::router(state.clone()))
        .merge(bookmarks::router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ];

    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        // Cookies require an explicit origin
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    }
}
