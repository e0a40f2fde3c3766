//! API service routes

use axum::{
    Json, Router, extract::DefaultBodyLimit, middleware, response::IntoResponse, routing::get,
};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{middleware::auth_middleware, state::AppState};

pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

/// Create the router for the API service
///
/// Resource routes live under `/api`. Uploaded images are served from the
/// media root when the media URL is a local path. Request bodies may carry
/// a full-size encoded image.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::router())
        .merge(tags::router())
        .merge(ingredients::router())
        .merge(recipes::router())
        .layer(DefaultBodyLimit::max(state.settings.body_limit()));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/s/:code", get(recipes::follow_short_link))
        .nest("/api", api);

    let media_url = state.settings.media_url.trim_end_matches('/');
    if media_url.starts_with('/') && media_url.len() > 1 {
        router = router.nest_service(media_url, ServeDir::new(state.media.root()));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
