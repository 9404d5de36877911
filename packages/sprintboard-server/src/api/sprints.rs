use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use sprintboard_core::sprint::{backlog, SprintSummary};
use sprintboard_core::storage::{BoardRepository, NewSprint};
use sprintboard_core::types::SprintPatch;

use super::{acting_user, api_error, require_editor, required_param, storage_error, ApiError};
use crate::state::AppState;

const DEFAULT_DONE_COLUMN: &str = "done";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintQuery {
    board_id: Option<String>,
}

pub async fn list_sprints(
    State(state): State<AppState>,
    Query(query): Query<SprintQuery>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.list_sprints";
    acting_user(&state, &headers, TARGET)?;
    let board_id = required_param(&query.board_id, "boardId", TARGET)?;
    let sprints = state.storage.list_sprints(board_id);
    let tasks: Vec<_> = state
        .storage
        .list_tasks(board_id)
        .into_iter()
        .filter(|t| !t.archived)
        .collect();
    Ok(Json(serde_json::json!({
        "sprints": sprints,
        "backlog": backlog(&tasks),
    })))
}

pub async fn create_sprint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewSprint>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    const TARGET: &str = "sprintboard.api.create_sprint";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    let sprint = state
        .storage
        .create_sprint(body)
        .map_err(|e| storage_error(TARGET, e))?;
    log::info!(target: TARGET, "Sprint {} created on board {}", sprint.id, sprint.board_id);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "sprint": sprint }))))
}

pub async fn update_sprint(
    State(state): State<AppState>,
    Path(sprint_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<SprintPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.update_sprint";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    let sprint = state
        .storage
        .update_sprint(&sprint_id, &patch)
        .map_err(|e| storage_error(TARGET, e))?;
    Ok(Json(serde_json::json!({ "sprint": sprint })))
}

pub async fn delete_sprint(
    State(state): State<AppState>,
    Path(sprint_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.delete_sprint";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    state
        .storage
        .delete_sprint(&sprint_id)
        .map_err(|e| storage_error(TARGET, e))?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Totals for a sprint. The board's last column counts as done.
pub async fn sprint_summary(
    State(state): State<AppState>,
    Path(sprint_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SprintSummary>, ApiError> {
    const TARGET: &str = "sprintboard.api.sprint_summary";
    acting_user(&state, &headers, TARGET)?;

    let sprint = state.storage.get_sprint(&sprint_id).ok_or_else(|| {
        api_error(StatusCode::NOT_FOUND, TARGET, format!("Sprint not found: {}", sprint_id))
    })?;
    let done_column = state
        .storage
        .get_board(&sprint.board_id)
        .and_then(|b| b.columns.iter().max_by_key(|c| c.order).map(|c| c.id.clone()))
        .unwrap_or_else(|| DEFAULT_DONE_COLUMN.to_string());

    let tasks = state.storage.list_tasks(&sprint.board_id);
    Ok(Json(SprintSummary::compute(&sprint, &tasks, &done_column)))
}
