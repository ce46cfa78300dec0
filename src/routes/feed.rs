use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    db::{redis::cache::TRENDING_TTL_SECS, CacheKey},
    error::AppResult,
    middleware::{AuthUser, RequestId},
    services::{feed, recommendations, ScoredMovie},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

pub async fn personalized(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<ScoredMovie>>> {
    let limit = query.limit.unwrap_or(state.feed_default_limit);

    let movies = recommendations::personalized_feed(
        state.catalog.as_ref(),
        state.interactions.as_ref(),
        state.users.as_ref(),
        user.user_id,
        limit,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user.user_id,
        returned = movies.len(),
        "Personalized feed generated"
    );

    Ok(Json(movies))
}

/// Trending feed, served from cache when Redis is configured
pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<ScoredMovie>>> {
    let limit = feed::validate_limit(query.limit.unwrap_or(state.feed_default_limit))?;

    let movies: Vec<ScoredMovie> = crate::cached!(
        state.cache,
        CacheKey::TrendingFeed(limit),
        TRENDING_TTL_SECS,
        recommendations::trending_feed(
            state.catalog.as_ref(),
            state.interactions.as_ref(),
            limit,
            Utc::now(),
        )
    )?;

    Ok(Json(movies))
}
