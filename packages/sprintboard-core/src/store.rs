/// Session-local task store for the board currently on screen.
///
/// Holds the full server-supplied task list, derives the base list (active
/// only, or everything when archived tasks are shown) and keeps the visible
/// projection equal to `sort(filter(base))` after every mutation.
use std::sync::Arc;

use crate::filter::{Facet, FilterState};
use crate::sort::SortState;
use crate::types::Task;
use crate::view::ViewState;

/// Immutable copy of the store's lists, taken before an optimistic change.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    all_tasks: Arc<[Task]>,
    projection: Arc<[Task]>,
    include_archived: bool,
}

impl StoreSnapshot {
    pub fn all_tasks(&self) -> &[Task] {
        &self.all_tasks
    }

    pub fn projection(&self) -> &[Task] {
        &self.projection
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    all_tasks: Vec<Task>,
    base: Vec<Task>,
    projection: Vec<Task>,
    view: ViewState,
    /// Incremented on every mutation.
    revision: u64,
}

impl TaskStore {
    pub fn new(all_tasks: Vec<Task>) -> Self {
        let mut store = Self::default();
        store.initialize(all_tasks);
        store
    }

    /// Set the full task list and reset the base to the active tasks.
    pub fn initialize(&mut self, all_tasks: Vec<Task>) {
        self.all_tasks = all_tasks;
        self.view.include_archived = false;
        self.refresh();
    }

    /// Swap the base between active-only and all tasks. Filter and sort
    /// selections are kept.
    pub fn set_include_archived(&mut self, include_archived: bool) {
        self.view.include_archived = include_archived;
        self.refresh();
    }

    /// Replace the underlying list (e.g. after a server refresh) and reapply
    /// the current filter and sort on top of it.
    pub fn replace_all(&mut self, all_tasks: Vec<Task>) {
        self.all_tasks = all_tasks;
        self.refresh();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.view.filter.search = search.into();
        self.refresh();
    }

    pub fn toggle_facet(&mut self, facet: Facet, value: &str) {
        self.view.filter.toggle(facet, value);
        self.refresh();
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.view.filter = filter;
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        self.view.filter.clear();
        self.refresh();
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.view.sort = Some(sort);
        self.refresh();
    }

    pub fn clear_sort(&mut self) {
        self.view.sort = None;
        self.refresh();
    }

    /// Apply a whole view state at once (filter, sort and archived toggle).
    pub fn set_view(&mut self, view: ViewState) {
        self.view = view;
        self.refresh();
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.all_tasks
    }

    /// Active tasks, or all tasks when archived ones are shown.
    pub fn base(&self) -> &[Task] {
        &self.base
    }

    /// The filtered and sorted list shown to the user.
    pub fn projection(&self) -> &[Task] {
        &self.projection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.all_tasks.iter().find(|t| t.id == task_id)
    }

    /// Set the status of one task. Nothing else on the task, and no other
    /// task, is touched. Returns the previous status, or `None` if the task
    /// is unknown.
    pub fn set_task_status(&mut self, task_id: &str, status: &str) -> Option<String> {
        let task = self.all_tasks.iter_mut().find(|t| t.id == task_id)?;
        let previous = std::mem::replace(&mut task.status, status.to_string());
        self.refresh();
        Some(previous)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            all_tasks: self.all_tasks.clone().into(),
            projection: self.projection.clone().into(),
            include_archived: self.view.include_archived,
        }
    }

    /// Put back the exact lists captured in `snapshot`. The projection is
    /// restored as captured rather than recomputed.
    pub fn restore(&mut self, snapshot: &StoreSnapshot) {
        self.all_tasks = snapshot.all_tasks.to_vec();
        self.view.include_archived = snapshot.include_archived;
        self.base = derive_base(&self.all_tasks, snapshot.include_archived);
        self.projection = snapshot.projection.to_vec();
        self.revision += 1;
    }

    fn refresh(&mut self) {
        self.base = derive_base(&self.all_tasks, self.view.include_archived);
        self.projection = self.view.project(&self.base);
        self.revision += 1;
    }
}

fn derive_base(all_tasks: &[Task], include_archived: bool) -> Vec<Task> {
    if include_archived {
        all_tasks.to_vec()
    } else {
        all_tasks.iter().filter(|t| !t.archived).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{SortDirection, SortKey};
    use crate::types::Priority;

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn archived(id: &str) -> Task {
        let mut task = Task::new(id, id, "todo");
        task.archived = true;
        task
    }

    #[test]
    fn test_initialize_excludes_archived() {
        let store = TaskStore::new(vec![
            Task::new("a", "a", "todo"),
            archived("x"),
            Task::new("b", "b", "done"),
        ]);
        assert_eq!(ids(store.base()), vec!["a", "b"]);
        assert_eq!(ids(store.projection()), vec!["a", "b"]);
        assert_eq!(store.all_tasks().len(), 3);
    }

    #[test]
    fn test_archived_toggle_round_trip() {
        let mut store = TaskStore::new(vec![
            Task::new("a", "a", "todo"),
            archived("x"),
            Task::new("b", "b", "done"),
            archived("y"),
        ]);
        let original = store.projection().to_vec();

        store.set_include_archived(true);
        assert_eq!(ids(store.projection()), vec!["a", "x", "b", "y"]);

        store.set_include_archived(false);
        assert_eq!(store.projection(), original.as_slice());
    }

    #[test]
    fn test_archived_toggle_keeps_filter_and_sort() {
        let mut store = TaskStore::new(vec![
            Task::new("a", "report", "todo").with_priority(Priority::Low),
            archived("report-old"),
            Task::new("b", "other", "todo"),
        ]);
        store.set_search("report");
        store.set_sort(SortState::new(SortKey::Priority, SortDirection::Desc));
        store.set_include_archived(true);

        assert_eq!(store.view().filter.search, "report");
        assert!(store.view().sort.is_some());
        // archived task defaults to medium priority, so it sorts first
        assert_eq!(ids(store.projection()), vec!["report-old", "a"]);
    }

    #[test]
    fn test_replace_all_reapplies_view() {
        let mut store = TaskStore::new(vec![Task::new("a", "alpha", "todo")]);
        store.set_search("beta");
        assert!(store.projection().is_empty());

        store.replace_all(vec![
            Task::new("a", "alpha", "todo"),
            Task::new("b", "beta", "todo"),
        ]);
        assert_eq!(store.view().filter.search, "beta");
        assert_eq!(ids(store.projection()), vec!["b"]);
    }

    #[test]
    fn test_set_task_status_touches_only_that_task() {
        let mut store = TaskStore::new(vec![
            Task::new("a", "a", "todo"),
            Task::new("b", "b", "todo"),
        ]);
        let before_a = store.task("a").cloned();
        let previous = store.set_task_status("b", "done");
        assert_eq!(previous.as_deref(), Some("todo"));
        assert_eq!(store.task("b").map(|t| t.status.as_str()), Some("done"));
        assert_eq!(store.task("a").cloned(), before_a);
        assert_eq!(store.set_task_status("missing", "done"), None);
    }

    #[test]
    fn test_snapshot_restore_is_exact() {
        let mut store = TaskStore::new(vec![
            Task::new("a", "a", "todo"),
            Task::new("b", "b", "todo"),
        ]);
        store.toggle_facet(Facet::Status, "todo");
        let snapshot = store.snapshot();

        store.set_task_status("b", "done");
        assert_eq!(ids(store.projection()), vec!["a"]);

        store.restore(&snapshot);
        assert_eq!(store.all_tasks(), snapshot.all_tasks());
        assert_eq!(store.projection(), snapshot.projection());
        assert_eq!(ids(store.projection()), vec!["a", "b"]);
    }

    #[test]
    fn test_revision_increases_on_mutation() {
        let mut store = TaskStore::new(Vec::new());
        let r0 = store.revision();
        store.set_search("x");
        assert!(store.revision() > r0);
    }
}
