use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use sprintboard_core::storage::{BoardRepository, NewNotification, NewTask};
use sprintboard_core::types::{NotificationKind, Task, TaskPatch, User};

use super::{acting_user, api_error, require_editor, storage_error, ApiError};
use crate::state::{AppState, TaskChangeEvent};

/// Tell `assignee` that `actor` handed them a task. Failing to store the
/// notification does not fail the task write.
fn notify_assignee(state: &AppState, actor: &User, assignee: &str, task: &Task) {
    if assignee == actor.id {
        return;
    }
    let notification = NewNotification {
        user_id: assignee.to_string(),
        title: "Task assigned".to_string(),
        message: format!("{} assigned you to \"{}\"", actor.name, task.title),
        kind: NotificationKind::Info,
        link: Some(format!("/boards/{}", task.board_id)),
    };
    if let Err(e) = state.storage.push_notification(notification) {
        log::warn!(
            target: "sprintboard.api.notify",
            "Could not notify {} about task {}: {}",
            assignee,
            task.id,
            e
        );
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut body): Json<NewTask>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    const TARGET: &str = "sprintboard.api.create_task";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    if body.title.trim().is_empty() || body.board_id.trim().is_empty() || body.status.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            "Title, boardId and status are required",
        ));
    }
    if body.assignee.as_deref().map_or(true, |a| a.trim().is_empty()) {
        body.assignee = Some(user.id.clone());
    }

    let task = state
        .storage
        .create_task(body)
        .map_err(|e| storage_error(TARGET, e))?;
    if let Some(assignee) = task.assignee.as_deref() {
        notify_assignee(&state, &user, assignee, &task);
    }

    log::info!(target: TARGET, "Task {} created on board {}", task.id, task.board_id);
    state.publish(TaskChangeEvent::Created {
        board_id: task.board_id.clone(),
        task: task.clone(),
    });
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "task": task }))))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.update_task";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    if patch.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, TARGET, "No fields to update"));
    }
    let previous = state
        .storage
        .get_task(&task_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, TARGET, format!("Task not found: {}", task_id)))?;

    let task = state
        .storage
        .update_task(&task_id, &patch)
        .map_err(|e| storage_error(TARGET, e))?;

    if let Some(Some(assignee)) = &patch.assignee {
        if previous.assignee.as_deref() != Some(assignee.as_str()) {
            notify_assignee(&state, &user, assignee, &task);
        }
    }
    if previous.status != task.status {
        log::info!(
            target: TARGET,
            "Task {} moved {} -> {}",
            task.id,
            previous.status,
            task.status
        );
    }

    state.publish(TaskChangeEvent::Updated {
        board_id: task.board_id.clone(),
        task: task.clone(),
    });
    Ok(Json(serde_json::json!({ "task": task })))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.delete_task";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    let task = state
        .storage
        .delete_task(&task_id)
        .map_err(|e| storage_error(TARGET, e))?;
    log::info!(target: TARGET, "Task {} deleted by {}", task.id, user.id);

    state.publish(TaskChangeEvent::Deleted {
        board_id: task.board_id,
        task_id: task.id,
    });
    Ok(Json(serde_json::json!({ "success": true })))
}
