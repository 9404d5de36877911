/// Shared application state passed to axum handlers.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sprintboard_core::storage::local::LocalStorage;
use sprintboard_core::types::Task;
use tokio::sync::broadcast;

/// Pushed to every SSE subscriber after a task is written.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TaskChangeEvent {
    Created { board_id: String, task: Task },
    Updated { board_id: String, task: Task },
    Deleted { board_id: String, task_id: String },
}

impl TaskChangeEvent {
    pub fn board_id(&self) -> &str {
        match self {
            TaskChangeEvent::Created { board_id, .. }
            | TaskChangeEvent::Updated { board_id, .. }
            | TaskChangeEvent::Deleted { board_id, .. } => board_id,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<LocalStorage>,
    pub event_tx: broadcast::Sender<TaskChangeEvent>,
    pub port: u16,
    pub bind_address: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(storage: Arc<LocalStorage>, port: u16, bind_address: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            storage,
            event_tx,
            port,
            bind_address: bind_address.into(),
            started_at: Instant::now(),
        }
    }

    /// Broadcast a task change. Having no subscribers is not an error.
    pub fn publish(&self, event: TaskChangeEvent) {
        let receivers = self.event_tx.send(event).unwrap_or(0);
        log::debug!(target: "sprintboard.events", "Task change sent to {} subscriber(s)", receivers);
    }
}
