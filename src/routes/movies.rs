use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{AdminUser, RequestId},
    models::{Movie, MovieUpdate, NewMovie, Page},
    services::{catalog, QueueStatus},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub movies: Vec<NewMovie>,
}

#[derive(Debug, Serialize)]
pub struct BatchAccepted {
    pub accepted: usize,
    pub status: QueueStatus,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page>> {
    let request = catalog::page_request(
        query.page,
        query.limit,
        query.sort.as_deref(),
        query.order.as_deref(),
    )?;
    let page = catalog::list_page(state.catalog.as_ref(), request).await?;
    Ok(Json(page))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Movie>> {
    let movie = catalog::get_movie(state.catalog.as_ref(), id).await?;
    Ok(Json(movie))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = catalog::search(state.catalog.as_ref(), query.q.as_deref()).await?;
    tracing::info!(request_id = %request_id, hits = movies.len(), "Movie search completed");
    Ok(Json(movies))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(movie): Json<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    tracing::debug!(admin_id = %admin.user_id, "Creating movie");
    let movie = catalog::create_movie(state.catalog.as_ref(), movie).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<MovieUpdate>,
) -> AppResult<Json<Movie>> {
    let movie = catalog::update_movie(state.catalog.as_ref(), id, update).await?;
    Ok(Json(movie))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    catalog::delete_movie(state.catalog.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Queues movies for background insertion and answers immediately
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    _admin: AdminUser,
    Json(request): Json<BatchRequest>,
) -> AppResult<(StatusCode, Json<BatchAccepted>)> {
    let accepted = request.movies.len();
    tracing::info!(request_id = %request_id, accepted, "Processing batch insert request");

    let status = catalog::enqueue_batch(
        &state.batch_queue,
        Arc::clone(&state.movie_inserter),
        request.movies,
    )?;

    Ok((StatusCode::ACCEPTED, Json(BatchAccepted { accepted, status })))
}
