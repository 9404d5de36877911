use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{Priority, Task, UNASSIGNED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Priority,
    Status,
    Assignee,
    Labels,
}

/// Search text plus the selected values of every facet. An empty set or an
/// empty search places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub priority: BTreeSet<Priority>,
    #[serde(default)]
    pub status: BTreeSet<String>,
    #[serde(default)]
    pub assignee: BTreeSet<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl FilterState {
    pub fn with_search(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    /// Add `value` to the facet, or remove it when already selected.
    /// Unknown priority names are ignored.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        fn flip<T: Ord>(set: &mut BTreeSet<T>, value: T) {
            if !set.remove(&value) {
                set.insert(value);
            }
        }
        match facet {
            Facet::Priority => {
                if let Ok(priority) = value.parse::<Priority>() {
                    flip(&mut self.priority, priority);
                }
            }
            Facet::Status => flip(&mut self.status, value.to_string()),
            Facet::Assignee => flip(&mut self.assignee, value.to_string()),
            Facet::Labels => flip(&mut self.labels, value.to_string()),
        }
    }

    /// Add `value` to the facet, keeping it when already selected.
    /// Fails on a priority name that does not parse.
    pub fn select(&mut self, facet: Facet, value: &str) -> Result<(), String> {
        match facet {
            Facet::Priority => {
                self.priority.insert(value.parse::<Priority>()?);
            }
            Facet::Status => {
                self.status.insert(value.to_string());
            }
            Facet::Assignee => {
                self.assignee.insert(value.to_string());
            }
            Facet::Labels => {
                self.labels.insert(value.to_string());
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of selected facet values (search text not counted).
    pub fn active_count(&self) -> usize {
        self.priority.len() + self.status.len() + self.assignee.len() + self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.active_count() == 0
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.search.trim().is_empty() && !matches_search(task, &self.search.to_lowercase()) {
            return false;
        }
        if !self.priority.is_empty() && !self.priority.contains(&task.priority) {
            return false;
        }
        if !self.status.is_empty() && !self.status.contains(&task.status) {
            return false;
        }
        if !self.assignee.is_empty() {
            let admitted = match &task.assignee {
                Some(assignee) => self.assignee.contains(assignee),
                None => self.assignee.contains(UNASSIGNED),
            };
            if !admitted {
                return false;
            }
        }
        if !self.labels.is_empty() && !task.labels.iter().any(|l| self.labels.contains(l)) {
            return false;
        }
        true
    }
}

/// Tasks from `tasks` that pass `filter`, in input order.
pub fn filter_tasks(tasks: &[Task], filter: &FilterState) -> Vec<Task> {
    if filter.is_empty() {
        return tasks.to_vec();
    }
    tasks.iter().filter(|t| filter.matches(t)).cloned().collect()
}

fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Task> {
        let mut a = Task::new("1", "Fix login bug", "todo").with_priority(Priority::High);
        a.assignee = Some("alice".into());
        a.labels = vec!["bug".into()];
        let mut b = Task::new("2", "Write release notes", "todo").with_priority(Priority::Low);
        b.description = Some("Covers the LOGIN changes".into());
        let mut c = Task::new("3", "Café menu", "done").with_priority(Priority::Medium);
        c.assignee = Some("bob".into());
        c.labels = vec!["ui".into(), "bug".into()];
        vec![a, b, c]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_search_title_or_description_case_insensitive() {
        let tasks = sample();
        let out = filter_tasks(&tasks, &FilterState::with_search("login"));
        assert_eq!(ids(&out), vec!["1", "2"]);
    }

    #[test]
    fn test_whitespace_search_matches_all() {
        let tasks = sample();
        let out = filter_tasks(&tasks, &FilterState::with_search("   "));
        assert_eq!(out, tasks);
    }

    #[test]
    fn test_search_is_plain_substring() {
        let tasks = sample();
        assert!(filter_tasks(&tasks, &FilterState::with_search("cafe")).is_empty());
        assert_eq!(ids(&filter_tasks(&tasks, &FilterState::with_search("CAFÉ"))), vec!["3"]);
        assert!(filter_tasks(&tasks, &FilterState::with_search("bug ")).is_empty());
    }

    #[test]
    fn test_select_keeps_repeated_value() {
        let tasks = sample();
        let mut filter = FilterState::default();
        filter.select(Facet::Priority, "high").unwrap();
        filter.select(Facet::Priority, "high").unwrap();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1"]);
        assert!(filter.select(Facet::Priority, "urgent").is_err());
    }

    #[test]
    fn test_facets_and_across_or_within() {
        let tasks = sample();
        let mut filter = FilterState::default();
        filter.toggle(Facet::Priority, "high");
        filter.toggle(Facet::Priority, "medium");
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1", "3"]);

        filter.toggle(Facet::Status, "done");
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["3"]);
    }

    #[test]
    fn test_unassigned_sentinel() {
        let tasks = sample();
        let mut filter = FilterState::default();
        filter.toggle(Facet::Assignee, UNASSIGNED);
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["2"]);

        filter.toggle(Facet::Assignee, "bob");
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["2", "3"]);
    }

    #[test]
    fn test_label_facet_matches_any_label() {
        let tasks = sample();
        let mut filter = FilterState::default();
        filter.toggle(Facet::Labels, "bug");
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1", "3"]);
    }

    #[test]
    fn test_toggle_twice_removes_value() {
        let mut filter = FilterState::default();
        filter.toggle(Facet::Status, "todo");
        assert_eq!(filter.active_count(), 1);
        filter.toggle(Facet::Status, "todo");
        assert_eq!(filter.active_count(), 0);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_is_idempotent_and_narrowing() {
        let tasks = sample();
        let mut filter = FilterState::with_search("i");
        filter.toggle(Facet::Labels, "bug");
        let once = filter_tasks(&tasks, &filter);
        let twice = filter_tasks(&once, &filter);
        assert_eq!(once, twice);
        assert!(once.iter().all(|t| tasks.contains(t)));
    }
}
