pub mod local;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::sprint::SprintError;
use crate::types::{
    Board, Comment, Notification, NotificationKind, Priority, Role, Sprint, SprintPatch, Task,
    TaskPatch, User,
};

/// Storage for everything the server exposes.
/// Implementations: LocalStorage (memory + optional JSON file).
pub trait BoardRepository: Send + Sync {
    fn get_user(&self, user_id: &str) -> Option<User>;
    fn list_users(&self) -> Vec<User>;
    /// Insert a user, or replace the one with the same id.
    fn upsert_user(&self, user: User) -> Result<User, StorageError>;
    fn set_user_role(&self, user_id: &str, role: Role) -> Result<User, StorageError>;

    /// Boards owned by `owner`, newest first.
    fn list_boards(&self, owner: &str) -> Vec<Board>;
    fn get_board(&self, board_id: &str) -> Option<Board>;
    /// Create a board with the default columns.
    fn create_board(&self, owner: &str, title: &str) -> Result<Board, StorageError>;
    /// Delete a board together with its tasks and sprints.
    fn delete_board(&self, board_id: &str) -> Result<(), StorageError>;
    /// Monotonic version, bumped on every change to the board or its tasks.
    fn board_version(&self, board_id: &str) -> Option<u64>;

    fn list_tasks(&self, board_id: &str) -> Vec<Task>;
    fn get_task(&self, task_id: &str) -> Option<Task>;
    fn create_task(&self, task: NewTask) -> Result<Task, StorageError>;
    fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, StorageError>;
    fn delete_task(&self, task_id: &str) -> Result<Task, StorageError>;

    /// Sprints of a board, earliest start first.
    fn list_sprints(&self, board_id: &str) -> Vec<Sprint>;
    fn get_sprint(&self, sprint_id: &str) -> Option<Sprint>;
    fn create_sprint(&self, sprint: NewSprint) -> Result<Sprint, StorageError>;
    fn update_sprint(&self, sprint_id: &str, patch: &SprintPatch) -> Result<Sprint, StorageError>;
    /// Delete a sprint; its tasks return to the backlog.
    fn delete_sprint(&self, sprint_id: &str) -> Result<(), StorageError>;

    /// Comments on a task, newest first.
    fn list_comments(&self, task_id: &str) -> Vec<Comment>;
    fn add_comment(&self, task_id: &str, user_id: &str, content: &str) -> Result<Comment, StorageError>;

    /// Notifications for a user, newest first.
    fn list_notifications(&self, user_id: &str) -> Vec<Notification>;
    fn push_notification(&self, notification: NewNotification) -> Result<Notification, StorageError>;
    fn mark_notification_read(&self, notification_id: &str, user_id: &str) -> Result<Notification, StorageError>;
}

/// Body of a task creation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub board_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub sprint_id: Option<String>,
    #[serde(default)]
    pub story_points: Option<u32>,
    #[serde(default, deserialize_with = "crate::types::deserialize_due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Body of a sprint creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSprint {
    pub name: String,
    #[serde(default)]
    pub goal: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub board_id: String,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound { kind, id: id.into() }
    }
}

impl From<SprintError> for StorageError {
    fn from(e: SprintError) -> Self {
        StorageError::Invalid(e.to_string())
    }
}

/// Content hash of a task list, used as an HTTP entity tag.
pub fn tasks_etag(tasks: &[Task]) -> String {
    let mut hasher = Sha256::new();
    for task in tasks {
        if let Ok(json) = serde_json::to_vec(task) {
            hasher.update(&json);
        }
        hasher.update(b"\n");
    }
    hex::encode(&hasher.finalize()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_changes_with_content() {
        let a = vec![Task::new("1", "a", "todo")];
        let mut b = a.clone();
        assert_eq!(tasks_etag(&a), tasks_etag(&b));
        b[0].status = "done".into();
        assert_ne!(tasks_etag(&a), tasks_etag(&b));
        assert_eq!(tasks_etag(&a).len(), 16);
    }

    #[test]
    fn test_new_task_minimal_body() {
        let body: NewTask =
            serde_json::from_str(r#"{"title":"T","boardId":"b","status":"todo"}"#).unwrap();
        assert_eq!(body.priority, None);
        assert!(body.labels.is_empty());
    }

    #[test]
    fn test_new_task_due_date_shapes() {
        let body: NewTask = serde_json::from_str(
            r#"{"title":"T","boardId":"b","status":"todo","dueDate":"2025-02-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(body.due_date, NaiveDate::from_ymd_opt(2025, 2, 1));

        let body: NewTask =
            serde_json::from_str(r#"{"title":"T","boardId":"b","status":"todo","dueDate":""}"#).unwrap();
        assert_eq!(body.due_date, None);
    }
}
