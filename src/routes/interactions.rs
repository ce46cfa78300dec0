use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{AdminUser, AuthUser},
    models::{Interaction, UserPreferences},
    services::interactions::{self, TrackInteractionRequest},
    state::AppState,
};

pub async fn track(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<TrackInteractionRequest>,
) -> AppResult<(StatusCode, Json<Interaction>)> {
    let interaction = interactions::track(
        state.catalog.as_ref(),
        state.interactions.as_ref(),
        state.users.as_ref(),
        user.user_id,
        request,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

pub async fn mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<Interaction>>> {
    let history = interactions::for_user(state.interactions.as_ref(), user.user_id).await?;
    Ok(Json(history))
}

pub async fn for_movie(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(movie_id): Path<Uuid>,
) -> AppResult<Json<Vec<Interaction>>> {
    let history = interactions::for_movie(
        state.catalog.as_ref(),
        state.interactions.as_ref(),
        movie_id,
    )
    .await?;
    Ok(Json(history))
}

pub async fn preferences(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UserPreferences>> {
    let prefs = interactions::preferences(state.users.as_ref(), user.user_id).await?;
    Ok(Json(prefs))
}
