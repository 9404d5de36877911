//! Board and task state for a Kanban / sprint-planning client.
//!
//! The session-side pieces (store, filter, sort, drag controller, board
//! view) are plain synchronous code over owned task lists; the only
//! suspension point is the persistence call made by [`drag::DragController`].
//! The `storage` module is the server-side record store.

pub mod board_view;
pub mod drag;
pub mod filter;
pub mod gateway;
pub mod notify;
pub mod sort;
pub mod sprint;
pub mod storage;
pub mod store;
pub mod types;
pub mod view;

pub use board_view::{BoardView, ColumnView};
pub use drag::{DragController, DragGesture, DragLocation, DragOutcome, DragPhase};
pub use filter::{filter_tasks, Facet, FilterState};
pub use gateway::{GatewayError, PersistenceGateway};
pub use notify::{LogNotifier, Notice, Notifier};
pub use sort::{sort_tasks, SortDirection, SortKey, SortState};
pub use store::TaskStore;
pub use view::ViewState;
