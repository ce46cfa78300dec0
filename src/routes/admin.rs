use axum::{extract::State, http::StatusCode, Json};

use crate::{middleware::AdminUser, services::QueueStatus, state::AppState};

pub async fn queue_status(State(state): State<AppState>, _admin: AdminUser) -> Json<QueueStatus> {
    Json(state.batch_queue.status())
}

/// Drops pending batch items. Inserts already in flight still complete.
pub async fn clear_queue(State(state): State<AppState>, AdminUser(admin): AdminUser) -> StatusCode {
    tracing::warn!(admin_id = %admin.user_id, "Clearing batch queue");
    state.batch_queue.clear();
    StatusCode::NO_CONTENT
}
