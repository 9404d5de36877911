/// Drag-and-drop status changes with optimistic update and rollback.
///
/// Each drop runs through
///
///   Idle -> Dropped -> OptimisticallyApplied -> Confirmed | RolledBack
///
/// The store snapshot is taken at `Dropped`, before anything is mutated, and
/// travels with the pending operation so a failed request can put back the
/// exact lists the user saw. The request itself runs without holding the
/// store, so the view stays usable while it is outstanding.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::gateway::{GatewayError, PersistenceGateway};
use crate::notify::{Notice, Notifier};
use crate::store::{StoreSnapshot, TaskStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    /// Column id (the droppable id).
    pub column_id: String,
    pub index: usize,
}

impl DragLocation {
    pub fn new(column_id: impl Into<String>, index: usize) -> Self {
        Self {
            column_id: column_id.into(),
            index,
        }
    }
}

/// A completed drag gesture as reported by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragGesture {
    pub task_id: String,
    pub source: DragLocation,
    /// `None` when the task was dropped outside every column.
    #[serde(default)]
    pub destination: Option<DragLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DragPhase {
    Idle,
    Dropped,
    OptimisticallyApplied,
    Confirmed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationId(u64);

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drag#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoOpReason {
    NoDestination,
    SamePosition,
    UnknownTask,
}

/// How much of the pre-drag state a failed operation put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RollbackScope {
    /// Nothing changed since the optimistic update: full snapshot restored.
    Snapshot,
    /// Newer changes exist: only the moved task's status was reverted.
    TaskOnly,
    /// The moved task no longer carries the optimistic status; left alone.
    Skipped,
}

/// An operation that has been applied locally and awaits the server.
#[derive(Debug, Clone)]
pub struct PendingDrag {
    id: OperationId,
    task_id: String,
    from_status: String,
    to_status: String,
    snapshot: StoreSnapshot,
    applied_revision: u64,
}

impl PendingDrag {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn destination_status(&self) -> &str {
        &self.to_status
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    pub fn phase(&self) -> DragPhase {
        DragPhase::OptimisticallyApplied
    }
}

#[derive(Debug)]
pub enum DragStart {
    NoOp(NoOpReason),
    Pending(PendingDrag),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    NoOp(NoOpReason),
    Confirmed(OperationId),
    RolledBack {
        id: OperationId,
        error: GatewayError,
        scope: RollbackScope,
    },
}

impl DragOutcome {
    /// Terminal phase the operation ended in.
    pub fn phase(&self) -> DragPhase {
        match self {
            DragOutcome::NoOp(_) => DragPhase::Idle,
            DragOutcome::Confirmed(_) => DragPhase::Confirmed,
            DragOutcome::RolledBack { .. } => DragPhase::RolledBack,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DragOutcome::RolledBack { .. })
    }
}

pub struct DragController<G, N> {
    gateway: G,
    notifier: N,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
}

impl<G: PersistenceGateway, N: Notifier> DragController<G, N> {
    pub fn new(gateway: G, notifier: N) -> Self {
        Self {
            gateway,
            notifier,
            next_id: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Number of operations applied locally and still waiting on the server.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Handle the drop: validate, snapshot, apply the new status locally.
    ///
    /// Returns `DragStart::NoOp` without touching the store when there is no
    /// destination, the task lands where it started, or the task is unknown.
    pub fn begin(&self, store: &mut TaskStore, gesture: &DragGesture) -> DragStart {
        let Some(destination) = &gesture.destination else {
            return DragStart::NoOp(NoOpReason::NoDestination);
        };
        if *destination == gesture.source {
            return DragStart::NoOp(NoOpReason::SamePosition);
        }
        if store.task(&gesture.task_id).is_none() {
            log::warn!(
                target: "sprintboard.drag",
                "Dropped unknown task {} on column {}",
                gesture.task_id,
                destination.column_id
            );
            return DragStart::NoOp(NoOpReason::UnknownTask);
        }

        let id = OperationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let snapshot = store.snapshot();
        log::debug!(
            target: "sprintboard.drag",
            "{} {:?}: task {} {} -> {}",
            id,
            DragPhase::Dropped,
            gesture.task_id,
            gesture.source.column_id,
            destination.column_id
        );

        let from_status = store
            .set_task_status(&gesture.task_id, &destination.column_id)
            .unwrap_or_else(|| gesture.source.column_id.clone());
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            target: "sprintboard.drag",
            "{} {:?}",
            id,
            DragPhase::OptimisticallyApplied
        );

        DragStart::Pending(PendingDrag {
            id,
            task_id: gesture.task_id.clone(),
            from_status,
            to_status: destination.column_id.clone(),
            snapshot,
            applied_revision: store.revision(),
        })
    }

    /// Reconcile a pending operation with the server's answer.
    ///
    /// On failure the full snapshot is restored only if the store has not
    /// changed since this operation applied; otherwise only this operation's
    /// own status change is reverted so newer state is not clobbered.
    pub fn complete(
        &self,
        store: &mut TaskStore,
        pending: PendingDrag,
        result: Result<(), GatewayError>,
    ) -> DragOutcome {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);

        let error = match result {
            Ok(()) => {
                log::debug!(target: "sprintboard.drag", "{} {:?}", pending.id, DragPhase::Confirmed);
                return DragOutcome::Confirmed(pending.id);
            }
            Err(error) => error,
        };

        let scope = if store.revision() == pending.applied_revision {
            store.restore(&pending.snapshot);
            RollbackScope::Snapshot
        } else if store
            .task(&pending.task_id)
            .is_some_and(|t| t.status == pending.to_status)
        {
            store.set_task_status(&pending.task_id, &pending.from_status);
            RollbackScope::TaskOnly
        } else {
            RollbackScope::Skipped
        };

        log::warn!(
            target: "sprintboard.drag",
            "{} {:?} ({:?}): failed to move task {} to {}: {}",
            pending.id,
            DragPhase::RolledBack,
            scope,
            pending.task_id,
            pending.to_status,
            error
        );
        self.notifier
            .notify(Notice::error(format!("Failed to update task: {}", error)));

        DragOutcome::RolledBack {
            id: pending.id,
            error,
            scope,
        }
    }

    /// Full drop handling against a shared store: apply locally, persist,
    /// reconcile. The store lock is released while the request is out.
    pub async fn drag_end(&self, store: &Mutex<TaskStore>, gesture: DragGesture) -> DragOutcome {
        let pending = {
            let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
            match self.begin(&mut guard, &gesture) {
                DragStart::NoOp(reason) => return DragOutcome::NoOp(reason),
                DragStart::Pending(pending) => pending,
            }
        };

        let result = self
            .gateway
            .update_task_status(pending.task_id(), pending.destination_status())
            .await;

        let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        self.complete(&mut guard, pending, result)
    }
}
