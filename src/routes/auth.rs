use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::UserProfile,
    services::auth::{LoginRequest, RegisterRequest},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = state.auth.register(state.users.as_ref(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, token) = state.auth.login(state.users.as_ref(), request).await?;
    Ok(Json(AuthResponse {
        token,
        user: UserProfile::from(&user),
    }))
}
