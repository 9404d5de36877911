use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use sprintboard_core::storage::BoardRepository;

use super::{acting_user, api_error, required_param, storage_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    task_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentBody {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.list_comments";
    acting_user(&state, &headers, TARGET)?;
    let task_id = required_param(&query.task_id, "taskId", TARGET)?;
    let comments = state.storage.list_comments(task_id);
    Ok(Json(serde_json::json!({ "comments": comments })))
}

/// Any known user may comment, viewers included.
pub async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AddCommentBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    const TARGET: &str = "sprintboard.api.add_comment";
    let user = acting_user(&state, &headers, TARGET)?;
    if body.task_id.trim().is_empty() || body.content.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            "taskId and content are required",
        ));
    }

    let comment = state
        .storage
        .add_comment(body.task_id.trim(), &user.id, body.content.trim())
        .map_err(|e| storage_error(TARGET, e))?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "comment": comment }))))
}
