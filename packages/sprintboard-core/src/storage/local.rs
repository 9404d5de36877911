/// In-memory repository with optional JSON persistence.
///
/// - All records live behind one RwLock
/// - Per-board monotonic version counter for ETags
/// - Atomic writes when backed by a file (write to .tmp, rename)
/// - Mutations apply to a copy that replaces the live data only after the
///   snapshot is written
/// - Mutex-guarded writes to prevent interleaved file updates
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BoardRepository, NewNotification, NewSprint, NewTask, StorageError};
use crate::sprint::sort_sprints;
use crate::types::*;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Data {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    boards: Vec<Board>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    sprints: Vec<Sprint>,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    notifications: Vec<Notification>,
    /// board_id -> version
    #[serde(skip)]
    versions: HashMap<String, u64>,
}

pub struct LocalStorage {
    data: RwLock<Data>,
    /// Snapshot file, if persistence is enabled
    file_path: Option<PathBuf>,
    write_lock: Mutex<()>,
    /// Global version counter (monotonic, shared across all boards)
    next_version: AtomicU64,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage {
    /// Memory-only storage.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Data::default()),
            file_path: None,
            write_lock: Mutex::new(()),
            next_version: AtomicU64::new(1),
        }
    }

    /// Load from `path` if it exists and persist every change back to it.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut data: Data = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(target: "sprintboard.storage", "No data file at {}, starting empty", path.display());
                Data::default()
            }
            Err(e) => return Err(e.into()),
        };

        let storage = Self {
            data: RwLock::new(Data::default()),
            file_path: Some(path.to_path_buf()),
            write_lock: Mutex::new(()),
            next_version: AtomicU64::new(1),
        };
        for board in &data.boards {
            let version = storage.next_version();
            data.versions.insert(board.id.clone(), version);
        }
        log::info!(
            target: "sprintboard.storage",
            "Loaded {} board(s), {} task(s) from {}",
            data.boards.len(),
            data.tasks.len(),
            path.display()
        );
        *storage.write() = data;
        Ok(storage)
    }

    fn next_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed)
    }

    fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Data> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch_board(&self, data: &mut Data, board_id: &str) {
        let version = self.next_version();
        data.versions.insert(board_id.to_string(), version);
    }

    /// Apply `change` to a copy of the data. The copy replaces the live
    /// data only once it is on disk, so a failed write changes nothing.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut Data) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.read().clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *self.write() = next;
        Ok(out)
    }

    /// Write `data` to the snapshot file, if any.
    fn persist(&self, data: &Data) -> Result<(), StorageError> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(data)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl BoardRepository for LocalStorage {
    fn get_user(&self, user_id: &str) -> Option<User> {
        self.read().users.iter().find(|u| u.id == user_id).cloned()
    }

    fn list_users(&self) -> Vec<User> {
        self.read().users.clone()
    }

    fn upsert_user(&self, user: User) -> Result<User, StorageError> {
        if user.email.trim().is_empty() {
            return Err(StorageError::Invalid("user: email is required".to_string()));
        }
        self.commit(|data| {
            if data.users.iter().any(|u| u.email == user.email && u.id != user.id) {
                return Err(StorageError::Invalid(format!("user: email {} already in use", user.email)));
            }
            match data.users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => *existing = user.clone(),
                None => data.users.push(user.clone()),
            }
            Ok(user)
        })
    }

    fn set_user_role(&self, user_id: &str, role: Role) -> Result<User, StorageError> {
        self.commit(|data| {
            let user = data
                .users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or_else(|| StorageError::not_found("User", user_id))?;
            user.role = role;
            Ok(user.clone())
        })
    }

    fn list_boards(&self, owner: &str) -> Vec<Board> {
        let mut boards: Vec<Board> = self
            .read()
            .boards
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect();
        boards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        boards
    }

    fn get_board(&self, board_id: &str) -> Option<Board> {
        self.read().boards.iter().find(|b| b.id == board_id).cloned()
    }

    fn create_board(&self, owner: &str, title: &str) -> Result<Board, StorageError> {
        if title.trim().is_empty() {
            return Err(StorageError::Invalid("board: title is required".to_string()));
        }
        let now = Utc::now();
        let board = Board {
            id: Self::new_id(),
            title: title.trim().to_string(),
            owner: owner.to_string(),
            columns: Board::default_columns(),
            created_at: now,
            updated_at: now,
        };
        if let Some(dup) = board.duplicate_column_id() {
            return Err(StorageError::Invalid(format!("board: duplicate column id {}", dup)));
        }
        self.commit(|data| {
            data.boards.push(board.clone());
            self.touch_board(data, &board.id);
            Ok(board)
        })
    }

    fn delete_board(&self, board_id: &str) -> Result<(), StorageError> {
        self.commit(|data| {
            let before = data.boards.len();
            data.boards.retain(|b| b.id != board_id);
            if data.boards.len() == before {
                return Err(StorageError::not_found("Board", board_id));
            }
            let removed: Vec<String> = data
                .tasks
                .iter()
                .filter(|t| t.board_id == board_id)
                .map(|t| t.id.clone())
                .collect();
            data.tasks.retain(|t| t.board_id != board_id);
            data.sprints.retain(|s| s.board_id != board_id);
            data.comments.retain(|c| !removed.contains(&c.task_id));
            data.versions.remove(board_id);
            Ok(())
        })
    }

    fn board_version(&self, board_id: &str) -> Option<u64> {
        self.read().versions.get(board_id).copied()
    }

    fn list_tasks(&self, board_id: &str) -> Vec<Task> {
        self.read()
            .tasks
            .iter()
            .filter(|t| t.board_id == board_id)
            .cloned()
            .collect()
    }

    fn get_task(&self, task_id: &str) -> Option<Task> {
        self.read().tasks.iter().find(|t| t.id == task_id).cloned()
    }

    fn create_task(&self, new: NewTask) -> Result<Task, StorageError> {
        if new.title.trim().is_empty() || new.board_id.is_empty() || new.status.is_empty() {
            return Err(StorageError::Invalid(
                "task: title, boardId and status are required".to_string(),
            ));
        }
        self.commit(|data| {
            if !data.boards.iter().any(|b| b.id == new.board_id) {
                return Err(StorageError::not_found("Board", new.board_id));
            }
            let order = data
                .tasks
                .iter()
                .filter(|t| t.board_id == new.board_id && t.status == new.status)
                .count() as i64;

            let mut task = Task::new(Self::new_id(), new.title.trim(), new.status);
            task.board_id = new.board_id;
            task.priority = new.priority.unwrap_or_default();
            task.description = new.description;
            task.assignee = new.assignee;
            task.sprint_id = new.sprint_id;
            task.story_points = new.story_points;
            task.due_date = new.due_date;
            task.labels = new.labels;
            task.order = order;

            data.tasks.push(task.clone());
            self.touch_board(data, &task.board_id);
            Ok(task)
        })
    }

    fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task, StorageError> {
        self.commit(|data| {
            let task = data
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| StorageError::not_found("Task", task_id))?;
            patch.apply(task);
            let task = task.clone();
            self.touch_board(data, &task.board_id);
            Ok(task)
        })
    }

    fn delete_task(&self, task_id: &str) -> Result<Task, StorageError> {
        self.commit(|data| {
            let index = data
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .ok_or_else(|| StorageError::not_found("Task", task_id))?;
            let task = data.tasks.remove(index);
            data.comments.retain(|c| c.task_id != task_id);
            self.touch_board(data, &task.board_id);
            Ok(task)
        })
    }

    fn list_sprints(&self, board_id: &str) -> Vec<Sprint> {
        let mut sprints: Vec<Sprint> = self
            .read()
            .sprints
            .iter()
            .filter(|s| s.board_id == board_id)
            .cloned()
            .collect();
        sort_sprints(&mut sprints);
        sprints
    }

    fn get_sprint(&self, sprint_id: &str) -> Option<Sprint> {
        self.read().sprints.iter().find(|s| s.id == sprint_id).cloned()
    }

    fn create_sprint(&self, new: NewSprint) -> Result<Sprint, StorageError> {
        if new.name.trim().is_empty() {
            return Err(StorageError::Invalid("sprint: name is required".to_string()));
        }
        if new.end_date < new.start_date {
            log::warn!(
                target: "sprintboard.storage",
                "Sprint {} ends before it starts ({} < {})",
                new.name,
                new.end_date,
                new.start_date
            );
        }
        self.commit(|data| {
            if !data.boards.iter().any(|b| b.id == new.board_id) {
                return Err(StorageError::not_found("Board", new.board_id));
            }
            let now = Utc::now();
            let sprint = Sprint {
                id: Self::new_id(),
                name: new.name.trim().to_string(),
                goal: new.goal,
                start_date: new.start_date,
                end_date: new.end_date,
                status: SprintStatus::Planned,
                board_id: new.board_id,
                created_at: now,
                updated_at: now,
            };
            data.sprints.push(sprint.clone());
            Ok(sprint)
        })
    }

    fn update_sprint(&self, sprint_id: &str, patch: &SprintPatch) -> Result<Sprint, StorageError> {
        self.commit(|data| {
            let sprint = data
                .sprints
                .iter_mut()
                .find(|s| s.id == sprint_id)
                .ok_or_else(|| StorageError::not_found("Sprint", sprint_id))?;
            if let Some(status) = patch.status {
                sprint.set_status(status)?;
            }
            if let Some(name) = &patch.name {
                sprint.name = name.clone();
            }
            if let Some(goal) = &patch.goal {
                sprint.goal = Some(goal.clone());
            }
            if let Some(start) = patch.start_date {
                sprint.start_date = start;
            }
            if let Some(end) = patch.end_date {
                sprint.end_date = end;
            }
            sprint.updated_at = Utc::now();
            Ok(sprint.clone())
        })
    }

    fn delete_sprint(&self, sprint_id: &str) -> Result<(), StorageError> {
        self.commit(|data| {
            let index = data
                .sprints
                .iter()
                .position(|s| s.id == sprint_id)
                .ok_or_else(|| StorageError::not_found("Sprint", sprint_id))?;
            let sprint = data.sprints.remove(index);
            let mut moved = 0;
            for task in data.tasks.iter_mut() {
                if task.sprint_id.as_deref() == Some(sprint_id) {
                    task.sprint_id = None;
                    moved += 1;
                }
            }
            if moved > 0 {
                self.touch_board(data, &sprint.board_id);
                log::info!(
                    target: "sprintboard.storage",
                    "Sprint {} deleted, {} task(s) returned to backlog",
                    sprint_id,
                    moved
                );
            }
            Ok(())
        })
    }

    fn list_comments(&self, task_id: &str) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .read()
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    fn add_comment(&self, task_id: &str, user_id: &str, content: &str) -> Result<Comment, StorageError> {
        if content.trim().is_empty() {
            return Err(StorageError::Invalid("comment: content is required".to_string()));
        }
        self.commit(|data| {
            if !data.tasks.iter().any(|t| t.id == task_id) {
                return Err(StorageError::not_found("Task", task_id));
            }
            let comment = Comment {
                id: Self::new_id(),
                task_id: task_id.to_string(),
                user_id: user_id.to_string(),
                content: content.to_string(),
                created_at: Utc::now(),
            };
            data.comments.push(comment.clone());
            Ok(comment)
        })
    }

    fn list_notifications(&self, user_id: &str) -> Vec<Notification> {
        let mut notifications: Vec<Notification> = self
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    fn push_notification(&self, new: NewNotification) -> Result<Notification, StorageError> {
        let notification = Notification {
            id: Self::new_id(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            kind: new.kind,
            read: false,
            link: new.link,
            created_at: Utc::now(),
        };
        self.commit(|data| {
            data.notifications.push(notification.clone());
            Ok(notification)
        })
    }

    fn mark_notification_read(&self, notification_id: &str, user_id: &str) -> Result<Notification, StorageError> {
        self.commit(|data| {
            let notification = data
                .notifications
                .iter_mut()
                .find(|n| n.id == notification_id && n.user_id == user_id)
                .ok_or_else(|| StorageError::not_found("Notification", notification_id))?;
            notification.read = true;
            Ok(notification.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            email: format!("{}@example.com", id),
            name: id.into(),
            avatar: None,
            role,
        }
    }

    fn new_task(board_id: &str, title: &str, status: &str) -> NewTask {
        NewTask {
            title: title.into(),
            board_id: board_id.into(),
            status: status.into(),
            ..NewTask::default()
        }
    }

    #[test]
    fn test_create_board_with_default_columns() {
        let storage = LocalStorage::new();
        let board = storage.create_board("u1", "Roadmap").unwrap();
        let ids: Vec<&str> = board.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "in-progress", "review", "done"]);
        assert!(storage.board_version(&board.id).is_some());
        assert!(storage.create_board("u1", "  ").is_err());
    }

    #[test]
    fn test_task_update_bumps_board_version() {
        let storage = LocalStorage::new();
        let board = storage.create_board("u1", "B").unwrap();
        let task = storage.create_task(new_task(&board.id, "T", "todo")).unwrap();
        assert_eq!(task.priority, Priority::Medium);

        let v1 = storage.board_version(&board.id).unwrap();
        let updated = storage.update_task(&task.id, &TaskPatch::status("done")).unwrap();
        assert_eq!(updated.status, "done");
        assert!(storage.board_version(&board.id).unwrap() > v1);
    }

    #[test]
    fn test_create_task_requires_fields_and_board() {
        let storage = LocalStorage::new();
        assert!(matches!(
            storage.create_task(new_task("b", "", "todo")),
            Err(StorageError::Invalid(_))
        ));
        assert!(matches!(
            storage.create_task(new_task("missing", "T", "todo")),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_sprint_returns_tasks_to_backlog() {
        let storage = LocalStorage::new();
        let board = storage.create_board("u1", "B").unwrap();
        let now = Utc::now();
        let sprint = storage
            .create_sprint(NewSprint {
                name: "Sprint 1".into(),
                goal: None,
                start_date: now,
                end_date: now + Duration::days(14),
                board_id: board.id.clone(),
            })
            .unwrap();
        let mut body = new_task(&board.id, "T", "todo");
        body.sprint_id = Some(sprint.id.clone());
        let task = storage.create_task(body).unwrap();

        storage.delete_sprint(&sprint.id).unwrap();
        assert_eq!(storage.get_task(&task.id).unwrap().sprint_id, None);
    }

    #[test]
    fn test_sprint_status_transition_validated() {
        let storage = LocalStorage::new();
        let board = storage.create_board("u1", "B").unwrap();
        let now = Utc::now();
        let sprint = storage
            .create_sprint(NewSprint {
                name: "S".into(),
                goal: None,
                start_date: now,
                end_date: now,
                board_id: board.id,
            })
            .unwrap();
        let complete = SprintPatch {
            status: Some(SprintStatus::Completed),
            ..SprintPatch::default()
        };
        assert!(matches!(
            storage.update_sprint(&sprint.id, &complete),
            Err(StorageError::Invalid(_))
        ));
        let start = SprintPatch {
            status: Some(SprintStatus::Active),
            ..SprintPatch::default()
        };
        assert_eq!(storage.update_sprint(&sprint.id, &start).unwrap().status, SprintStatus::Active);
    }

    #[test]
    fn test_notifications_scoped_to_user() {
        let storage = LocalStorage::new();
        let n = storage
            .push_notification(NewNotification {
                user_id: "u1".into(),
                title: "Assigned".into(),
                message: "You have a task".into(),
                kind: NotificationKind::Info,
                link: None,
            })
            .unwrap();
        assert_eq!(storage.list_notifications("u1").len(), 1);
        assert!(storage.list_notifications("u2").is_empty());
        assert!(storage.mark_notification_read(&n.id, "u2").is_err());
        assert!(storage.mark_notification_read(&n.id, "u1").unwrap().read);
    }

    #[test]
    fn test_upsert_rejects_duplicate_email() {
        let storage = LocalStorage::new();
        storage.upsert_user(user("u1", Role::Admin)).unwrap();
        let mut clash = user("u2", Role::Viewer);
        clash.email = "u1@example.com".into();
        assert!(storage.upsert_user(clash).is_err());
        assert_eq!(storage.set_user_role("u1", Role::Developer).unwrap().role, Role::Developer);
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let storage = LocalStorage::open(&path).unwrap();
        storage.upsert_user(user("u1", Role::Admin)).unwrap();
        let board = storage.create_board("u1", "Persisted").unwrap();
        storage.create_task(new_task(&board.id, "T", "todo")).unwrap();
        drop(storage);

        let reopened = LocalStorage::open(&path).unwrap();
        assert_eq!(reopened.list_boards("u1").len(), 1);
        assert_eq!(reopened.list_tasks(&board.id).len(), 1);
        assert!(reopened.board_version(&board.id).is_some());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_data_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let storage = LocalStorage::open(&data_dir.join("board.json")).unwrap();
        let board = storage.create_board("u1", "B").unwrap();
        let task = storage.create_task(new_task(&board.id, "T", "todo")).unwrap();
        let version = storage.board_version(&board.id);

        // A plain file where the data directory was makes every write fail.
        fs::remove_dir_all(&data_dir).unwrap();
        fs::write(&data_dir, "x").unwrap();

        assert!(storage.update_task(&task.id, &TaskPatch::status("done")).is_err());
        assert_eq!(storage.get_task(&task.id).unwrap().status, "todo");
        assert_eq!(storage.board_version(&board.id), version);
        assert!(storage.create_board("u1", "Other").is_err());
        assert_eq!(storage.list_boards("u1").len(), 1);
    }
}
