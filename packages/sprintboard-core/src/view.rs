/// Board view state as an explicit value: filter selection, optional sort and
/// the archived toggle. Serializable so a container can persist or share it.
use serde::{Deserialize, Serialize};

use crate::filter::{filter_tasks, FilterState};
use crate::sort::{sort_tasks, SortState};
use crate::types::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    #[serde(default)]
    pub filter: FilterState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortState>,
    #[serde(default)]
    pub include_archived: bool,
}

impl ViewState {
    /// `sort(filter(base))`: filter narrows first, then the sort orders the
    /// narrowed set. Without a sort the base order is kept.
    pub fn project(&self, base: &[Task]) -> Vec<Task> {
        let filtered = filter_tasks(base, &self.filter);
        match self.sort {
            Some(sort) => sort_tasks(&filtered, sort.sort_by, sort.direction),
            None => filtered,
        }
    }
}
