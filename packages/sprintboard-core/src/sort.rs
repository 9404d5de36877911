use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::types::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Priority,
    DueDate,
    Assignee,
    CreatedAt,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Priority => "priority",
            SortKey::DueDate => "dueDate",
            SortKey::Assignee => "assignee",
            SortKey::CreatedAt => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub sort_by: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(sort_by: SortKey, direction: SortDirection) -> Self {
        Self { sort_by, direction }
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{}-{}", self.sort_by.as_str(), dir)
    }
}

/// Parses the `"<key>-<direction>"` form used by the sort selector,
/// e.g. `priority-desc` or `dueDate-asc`.
impl FromStr for SortState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, dir) = s
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| format!("expected <key>-<direction>, got {:?}", s))?;
        let sort_by = match key {
            "priority" => SortKey::Priority,
            "dueDate" => SortKey::DueDate,
            "assignee" => SortKey::Assignee,
            "createdAt" => SortKey::CreatedAt,
            other => return Err(format!("unknown sort key: {}", other)),
        };
        let direction = match dir {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => return Err(format!("unknown sort direction: {}", other)),
        };
        Ok(Self { sort_by, direction })
    }
}

/// Stable sort of a copy of `tasks`. Ties keep their input order.
///
/// Tasks without a due date always come after dated ones when sorting by
/// `DueDate`, whichever the direction.
pub fn sort_tasks(tasks: &[Task], sort_by: SortKey, direction: SortDirection) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| compare(a, b, sort_by, direction));
    sorted
}

fn compare(a: &Task, b: &Task, sort_by: SortKey, direction: SortDirection) -> Ordering {
    let natural = match sort_by {
        SortKey::Priority => a.priority.weight().cmp(&b.priority.weight()),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        },
        SortKey::Assignee => a
            .assignee
            .as_deref()
            .unwrap_or("")
            .cmp(b.assignee.as_deref().unwrap_or("")),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    match direction {
        SortDirection::Asc => natural,
        SortDirection::Desc => natural.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use chrono::{Duration, NaiveDate, Utc};

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn dated(id: &str, date: Option<(i32, u32, u32)>) -> Task {
        let mut task = Task::new(id, id, "todo");
        task.due_date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        task
    }

    #[test]
    fn test_priority_desc() {
        let tasks = vec![
            Task::new("low", "a", "todo").with_priority(Priority::Low),
            Task::new("high", "b", "todo").with_priority(Priority::High),
            Task::new("medium", "c", "todo").with_priority(Priority::Medium),
        ];
        let out = sort_tasks(&tasks, SortKey::Priority, SortDirection::Desc);
        assert_eq!(ids(&out), vec!["high", "medium", "low"]);
    }

    #[test]
    fn test_due_date_missing_always_last() {
        let tasks = vec![
            dated("none", None),
            dated("jan", Some((2025, 1, 1))),
            dated("feb", Some((2025, 2, 1))),
        ];
        let asc = sort_tasks(&tasks, SortKey::DueDate, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["jan", "feb", "none"]);
        let desc = sort_tasks(&tasks, SortKey::DueDate, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["feb", "jan", "none"]);
    }

    #[test]
    fn test_assignee_missing_sorts_first_ascending() {
        let mut a = Task::new("a", "a", "todo");
        a.assignee = Some("zoe".into());
        let b = Task::new("b", "b", "todo");
        let mut c = Task::new("c", "c", "todo");
        c.assignee = Some("adam".into());
        let out = sort_tasks(&[a, b, c], SortKey::Assignee, SortDirection::Asc);
        assert_eq!(ids(&out), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_created_at_order() {
        let now = Utc::now();
        let mut old = Task::new("old", "a", "todo");
        old.created_at = now - Duration::days(2);
        let mut new = Task::new("new", "b", "todo");
        new.created_at = now;
        let out = sort_tasks(&[new.clone(), old.clone()], SortKey::CreatedAt, SortDirection::Asc);
        assert_eq!(ids(&out), vec!["old", "new"]);
        let out = sort_tasks(&[old, new], SortKey::CreatedAt, SortDirection::Desc);
        assert_eq!(ids(&out), vec!["new", "old"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let tasks = vec![
            Task::new("x", "x", "todo").with_priority(Priority::High),
            Task::new("y", "y", "todo").with_priority(Priority::Low),
            Task::new("z", "z", "todo").with_priority(Priority::High),
            Task::new("w", "w", "todo").with_priority(Priority::Low),
        ];
        let asc = sort_tasks(&tasks, SortKey::Priority, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["y", "w", "x", "z"]);
        let desc = sort_tasks(&tasks, SortKey::Priority, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["x", "z", "y", "w"]);
    }

    #[test]
    fn test_sort_does_not_mutate_input() {
        let tasks = vec![
            Task::new("a", "a", "todo").with_priority(Priority::Low),
            Task::new("b", "b", "todo").with_priority(Priority::High),
        ];
        let before = tasks.clone();
        let _ = sort_tasks(&tasks, SortKey::Priority, SortDirection::Desc);
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_parse_selector_value() {
        let state: SortState = "dueDate-desc".parse().unwrap();
        assert_eq!(state, SortState::new(SortKey::DueDate, SortDirection::Desc));
        assert_eq!(state.to_string(), "dueDate-desc");
        assert!("priority".parse::<SortState>().is_err());
        assert!("title-asc".parse::<SortState>().is_err());
    }
}
