use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use sprintboard_core::storage::BoardRepository;
use sprintboard_core::types::{Role, User};

use super::{acting_user, api_error, require_admin, storage_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterUserBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateRoleBody {
    #[serde(default)]
    role: String,
}

fn parse_role(raw: &str) -> Option<Role> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string())).ok()
}

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    acting_user(&state, &headers, "sprintboard.api.list_users")?;
    let mut users = state.storage.list_users();
    users.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(serde_json::json!({ "users": users })))
}

/// New accounts always start as viewers.
pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    const TARGET: &str = "sprintboard.api.register_user";
    let id = body.id.trim();
    if id.is_empty() || body.email.trim().is_empty() || body.name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            "id, email and name are required",
        ));
    }
    if state.storage.get_user(id).is_some() {
        return Err(api_error(
            StatusCode::CONFLICT,
            TARGET,
            format!("User ID already exists: {}", id),
        ));
    }

    let user = state
        .storage
        .upsert_user(User {
            id: id.to_string(),
            email: body.email.trim().to_string(),
            name: body.name.trim().to_string(),
            avatar: body.avatar,
            role: Role::Viewer,
        })
        .map_err(|e| storage_error(TARGET, e))?;
    log::info!(target: TARGET, "Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "user": user }))))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateRoleBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    const TARGET: &str = "sprintboard.api.update_user_role";
    let admin = acting_user(&state, &headers, TARGET)?;
    require_admin(&admin, TARGET)?;

    let role = parse_role(&body.role).ok_or_else(|| {
        api_error(StatusCode::BAD_REQUEST, TARGET, format!("Invalid role: {}", body.role))
    })?;
    if user_id == admin.id {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            TARGET,
            "Cannot change your own role",
        ));
    }

    let user = state
        .storage
        .set_user_role(&user_id, role)
        .map_err(|e| storage_error(TARGET, e))?;
    log::info!(target: TARGET, "User {} role set to {:?} by {}", user.id, role, admin.id);
    Ok(Json(serde_json::json!({ "user": user })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_names() {
        assert_eq!(parse_role("project_manager"), Some(Role::ProjectManager));
        assert_eq!(parse_role(" admin "), Some(Role::Admin));
        assert_eq!(parse_role("superuser"), None);
    }
}
