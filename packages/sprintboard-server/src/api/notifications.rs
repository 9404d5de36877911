use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use sprintboard_core::storage::BoardRepository;

use super::{acting_user, storage_error, ApiError};
use crate::state::AppState;

pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = acting_user(&state, &headers, "sprintboard.api.list_notifications")?;
    let notifications = state.storage.list_notifications(&user.id);
    let unread = notifications.iter().filter(|n| !n.read).count();
    Ok(Json(serde_json::json!({
        "notifications": notifications,
        "unread": unread,
    })))
}

/// Only the recipient can mark a notification read; others see 404.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.mark_read";
    let user = acting_user(&state, &headers, TARGET)?;
    let notification = state
        .storage
        .mark_notification_read(&notification_id, &user.id)
        .map_err(|e| storage_error(TARGET, e))?;
    Ok(Json(serde_json::json!({ "notification": notification })))
}
