use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod feed;
pub mod interactions;
pub mod movies;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/search", get(movies::search))
        .route("/movies/batch", post(movies::create_batch))
        .route(
            "/movies/:id",
            get(movies::get).put(movies::update).delete(movies::delete),
        )
        .route("/movies/:id/interactions", get(interactions::for_movie))
        .route("/interactions", post(interactions::track))
        .route("/interactions/me", get(interactions::mine))
        .route("/users/me/preferences", get(interactions::preferences))
        .route("/feed", get(feed::personalized))
        .route("/feed/trending", get(feed::trending))
        .route("/admin/queue", get(admin::queue_status).delete(admin::clear_queue))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
