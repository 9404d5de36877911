use axum::{
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use sprintboard_core::storage::{BoardRepository, StorageError};
use sprintboard_core::types::User;

mod boards;
mod comments;
mod events;
mod notifications;
mod sprints;
mod tasks;
mod users;


use crate::state::AppState;

/// Axum REST API routes, nested under `/api`.
///
///   GET    /boards                      -> boards owned by the acting user
///   POST   /boards                      -> create board with default columns
///   GET    /boards/{board_id}           -> board plus composed column view
///   DELETE /boards/{board_id}           -> delete board, its tasks and sprints
///   GET    /boards/{board_id}/tasks     -> task list (+ ETag, view query params)
///   POST   /tasks                       -> create task
///   PATCH  /tasks/{task_id}             -> partial task update
///   DELETE /tasks/{task_id}             -> delete task
///   GET    /sprints?boardId=            -> sprints of a board
///   POST   /sprints                     -> create sprint
///   PATCH  /sprints/{sprint_id}         -> update sprint (status transitions checked)
///   DELETE /sprints/{sprint_id}         -> delete sprint, tasks return to backlog
///   GET    /sprints/{sprint_id}/summary -> task and story point totals
///   GET    /comments?taskId=            -> comments on a task
///   POST   /comments                    -> add comment
///   GET    /notifications               -> acting user's notifications
///   POST   /notifications/{id}/read     -> mark one read
///   GET    /users                       -> all users
///   POST   /users                       -> register a viewer account
///   PATCH  /users/{user_id}             -> change role (admin only)
///   GET    /events                      -> SSE stream of task changes
///   GET    /status                      -> health check
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/boards/{board_id}",
            get(boards::get_board).delete(boards::delete_board),
        )
        .route("/boards/{board_id}/tasks", get(boards::list_board_tasks))
        .route("/tasks", post(tasks::create_task))
        .route(
            "/tasks/{task_id}",
            patch(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/sprints", get(sprints::list_sprints).post(sprints::create_sprint))
        .route(
            "/sprints/{sprint_id}",
            patch(sprints::update_sprint).delete(sprints::delete_sprint),
        )
        .route("/sprints/{sprint_id}/summary", get(sprints::sprint_summary))
        .route(
            "/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_read),
        )
        .route("/users", get(users::list_users).post(users::register_user))
        .route("/users/{user_id}", patch(users::update_user_role))
        .route("/events", get(events::sse_events))
        .route("/status", get(events::status))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) const USER_HEADER: &str = "x-user-id";

fn insert_header_safe(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match value.parse() {
        Ok(parsed) => {
            headers.insert(name, parsed);
        }
        Err(e) => {
            log::warn!("Failed to set header {}={} ({})", name, value, e);
        }
    }
}

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}

fn api_error(status: StatusCode, target: &'static str, error: impl Into<String>) -> ApiError {
    let error = error.into();
    log_api_issue(status, target, &error);
    (status, Json(ErrorResponse { error }))
}

fn storage_error(target: &'static str, e: StorageError) -> ApiError {
    let status = match &e {
        StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
        StorageError::Invalid(_) => StatusCode::BAD_REQUEST,
        StorageError::Io(_) | StorageError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, target, e.to_string())
}

/// Resolve the `X-User-Id` header to a known user.
fn acting_user(state: &AppState, headers: &HeaderMap, target: &'static str) -> Result<User, ApiError> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, target, "Unauthorized"))?;
    state
        .storage
        .get_user(user_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, target, format!("User not found: {}", user_id)))
}

fn require_editor(user: &User, target: &'static str) -> Result<(), ApiError> {
    if user.role.can_edit() {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::FORBIDDEN,
            target,
            format!("User {} has read-only access", user.id),
        ))
    }
}

fn require_admin(user: &User, target: &'static str) -> Result<(), ApiError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(api_error(StatusCode::FORBIDDEN, target, "Admin access required"))
    }
}

/// Read a required query parameter, 400 when absent or blank.
fn required_param<'a>(
    value: &'a Option<String>,
    name: &str,
    target: &'static str,
) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, target, format!("{} is required", name)))
}
