use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use sprintboard_core::storage::{tasks_etag, BoardRepository};
use sprintboard_core::types::{Board, Task, User};
use sprintboard_core::{BoardView, Facet, FilterState, SortState, ViewState};

use super::{acting_user, api_error, insert_header_safe, require_editor, storage_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBoardBody {
    #[serde(default)]
    title: String,
}

/// View parameters for the task list. Facet values are comma separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    search: Option<String>,
    sort: Option<String>,
    #[serde(default)]
    include_archived: bool,
    priority: Option<String>,
    status: Option<String>,
    assignee: Option<String>,
    labels: Option<String>,
}

impl TaskListQuery {
    fn view_state(&self) -> Result<ViewState, String> {
        let mut filter = FilterState::with_search(self.search.clone().unwrap_or_default());
        let facets = [
            (Facet::Priority, &self.priority),
            (Facet::Status, &self.status),
            (Facet::Assignee, &self.assignee),
            (Facet::Labels, &self.labels),
        ];
        for (facet, raw) in facets {
            for value in raw.iter().flat_map(|r| r.split(',')) {
                let value = value.trim();
                if !value.is_empty() {
                    filter.select(facet, value)?;
                }
            }
        }
        let sort = match self.sort.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<SortState>()?),
            _ => None,
        };
        Ok(ViewState {
            filter,
            sort,
            include_archived: self.include_archived,
        })
    }
}

/// Boards are private to their owner; anyone else gets a 404.
fn owned_board(
    state: &AppState,
    user: &User,
    board_id: &str,
    target: &'static str,
) -> Result<Board, ApiError> {
    state
        .storage
        .get_board(board_id)
        .filter(|b| b.owner == user.id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, target, format!("Board not found: {}", board_id)))
}

fn visible_tasks(tasks: Vec<Task>, include_archived: bool) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| include_archived || !t.archived)
        .collect()
}

pub async fn list_boards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = acting_user(&state, &headers, "sprintboard.api.list_boards")?;
    let boards = state.storage.list_boards(&user.id);
    Ok(Json(serde_json::json!({ "boards": boards })))
}

pub async fn create_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateBoardBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    const TARGET: &str = "sprintboard.api.create_board";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;

    let board = state
        .storage
        .create_board(&user.id, &body.title)
        .map_err(|e| storage_error(TARGET, e))?;
    log::info!(target: TARGET, "Board {} created by {}", board.id, user.id);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "board": board }))))
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.get_board";
    let user = acting_user(&state, &headers, TARGET)?;
    let board = owned_board(&state, &user, &board_id, TARGET)?;

    let tasks = visible_tasks(state.storage.list_tasks(&board_id), false);
    let view = BoardView::compose(&board, &tasks);
    Ok(Json(serde_json::json!({
        "board": board,
        "view": view,
        "version": state.storage.board_version(&board_id).unwrap_or(0),
    })))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.delete_board";
    let user = acting_user(&state, &headers, TARGET)?;
    require_editor(&user, TARGET)?;
    owned_board(&state, &user, &board_id, TARGET)?;

    state
        .storage
        .delete_board(&board_id)
        .map_err(|e| storage_error(TARGET, e))?;
    log::info!(target: TARGET, "Board {} deleted by {}", board_id, user.id);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Projected task list of a board. The entity tag hashes the response
/// content, so it also varies with the view parameters.
pub async fn list_board_tasks(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    Query(query): Query<TaskListQuery>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap, Json<serde_json::Value>), ApiError> {
    const TARGET: &str = "sprintboard.api.list_tasks";
    acting_user(&state, &headers, TARGET)?;
    if state.storage.get_board(&board_id).is_none() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            TARGET,
            format!("Board not found: {}", board_id),
        ));
    }

    let view = query
        .view_state()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, TARGET, e))?;
    let base = visible_tasks(state.storage.list_tasks(&board_id), view.include_archived);
    let tasks = view.project(&base);
    let etag = format!("\"{}\"", tasks_etag(&tasks));

    let mut resp_headers = HeaderMap::new();
    insert_header_safe(&mut resp_headers, "etag", &etag);

    // Check If-None-Match for conditional response
    if let Some(if_none_match) = headers.get("if-none-match") {
        if let Ok(value) = if_none_match.to_str() {
            if value == etag {
                return Ok((
                    StatusCode::NOT_MODIFIED,
                    resp_headers,
                    Json(serde_json::json!({})),
                ));
            }
        }
    }

    Ok((
        StatusCode::OK,
        resp_headers,
        Json(serde_json::json!({
            "boardId": board_id,
            "tasks": tasks,
            "view": view,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintboard_core::types::Priority;

    #[test]
    fn test_query_builds_view_state() {
        let query = TaskListQuery {
            search: Some("login".into()),
            sort: Some("priority-desc".into()),
            priority: Some("high, low".into()),
            labels: Some("bug".into()),
            ..TaskListQuery::default()
        };
        let view = query.view_state().unwrap();
        assert_eq!(view.filter.search, "login");
        assert!(view.filter.priority.contains(&Priority::High));
        assert!(view.filter.priority.contains(&Priority::Low));
        assert!(view.filter.labels.contains("bug"));
        assert_eq!(view.sort.map(|s| s.to_string()).as_deref(), Some("priority-desc"));
    }

    #[test]
    fn test_query_repeated_facet_value_stays_selected() {
        let query = TaskListQuery {
            priority: Some("high,high".into()),
            ..TaskListQuery::default()
        };
        let view = query.view_state().unwrap();
        assert_eq!(view.filter.priority.len(), 1);

        let query = TaskListQuery {
            priority: Some("urgent".into()),
            ..TaskListQuery::default()
        };
        assert!(query.view_state().is_err());
    }

    #[test]
    fn test_query_rejects_unknown_sort() {
        let query = TaskListQuery {
            sort: Some("colour-asc".into()),
            ..TaskListQuery::default()
        };
        assert!(query.view_state().is_err());
    }
}
