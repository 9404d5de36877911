use chrono::Utc;
use serde::Serialize;

use crate::types::{Sprint, SprintStatus, Task};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SprintError {
    #[error("Cannot move sprint {sprint_id} from {from} to {to}")]
    InvalidTransition {
        sprint_id: String,
        from: SprintStatus,
        to: SprintStatus,
    },
}

impl Sprint {
    /// planned -> active
    pub fn start(&mut self) -> Result<(), SprintError> {
        self.transition(SprintStatus::Planned, SprintStatus::Active)
    }

    /// active -> completed
    pub fn complete(&mut self) -> Result<(), SprintError> {
        self.transition(SprintStatus::Active, SprintStatus::Completed)
    }

    /// Validate a requested status change. Setting the current status again
    /// is allowed; otherwise only planned -> active -> completed.
    pub fn set_status(&mut self, to: SprintStatus) -> Result<(), SprintError> {
        match (self.status, to) {
            (from, to) if from == to => Ok(()),
            (SprintStatus::Planned, SprintStatus::Active) => self.start(),
            (SprintStatus::Active, SprintStatus::Completed) => self.complete(),
            (from, to) => Err(SprintError::InvalidTransition {
                sprint_id: self.id.clone(),
                from,
                to,
            }),
        }
    }

    fn transition(&mut self, from: SprintStatus, to: SprintStatus) -> Result<(), SprintError> {
        if self.status != from {
            return Err(SprintError::InvalidTransition {
                sprint_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Tasks not planned into any sprint, in input order.
pub fn backlog(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.sprint_id.is_none()).collect()
}

pub fn sprint_tasks<'a>(tasks: &'a [Task], sprint_id: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.sprint_id.as_deref() == Some(sprint_id))
        .collect()
}

/// Order sprints by start date, earliest first.
pub fn sort_sprints(sprints: &mut [Sprint]) {
    sprints.sort_by_key(|s| s.start_date);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSummary {
    pub sprint_id: String,
    pub task_count: usize,
    pub total_points: u64,
    pub completed_points: u64,
    pub completed_tasks: usize,
}

impl SprintSummary {
    /// Count the sprint's tasks and story points; a task is completed when
    /// its status equals `done_column`.
    pub fn compute(sprint: &Sprint, tasks: &[Task], done_column: &str) -> Self {
        let mut summary = Self {
            sprint_id: sprint.id.clone(),
            task_count: 0,
            total_points: 0,
            completed_points: 0,
            completed_tasks: 0,
        };
        for task in sprint_tasks(tasks, &sprint.id) {
            let points = u64::from(task.story_points.unwrap_or(0));
            summary.task_count += 1;
            summary.total_points += points;
            if task.status == done_column {
                summary.completed_tasks += 1;
                summary.completed_points += points;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sprint(id: &str, days_from_now: i64) -> Sprint {
        let start = Utc::now() + Duration::days(days_from_now);
        Sprint {
            id: id.into(),
            name: id.into(),
            goal: None,
            start_date: start,
            end_date: start + Duration::days(14),
            status: SprintStatus::Planned,
            board_id: "b1".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn planned(id: &str, sprint_id: Option<&str>, status: &str, points: u32) -> Task {
        let mut task = Task::new(id, id, status);
        task.sprint_id = sprint_id.map(String::from);
        task.story_points = Some(points);
        task
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut s = sprint("s1", 0);
        assert!(s.complete().is_err());
        s.start().unwrap();
        assert_eq!(s.status, SprintStatus::Active);
        assert!(s.start().is_err());
        s.complete().unwrap();
        assert_eq!(s.status, SprintStatus::Completed);
        assert!(s.set_status(SprintStatus::Planned).is_err());
        assert!(s.set_status(SprintStatus::Completed).is_ok());
    }

    #[test]
    fn test_backlog_and_sprint_tasks() {
        let tasks = vec![
            planned("1", None, "todo", 1),
            planned("2", Some("s1"), "todo", 3),
            planned("3", None, "done", 2),
        ];
        let ids: Vec<&str> = backlog(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(sprint_tasks(&tasks, "s1").len(), 1);
    }

    #[test]
    fn test_summary_counts_points() {
        let tasks = vec![
            planned("1", Some("s1"), "done", 5),
            planned("2", Some("s1"), "todo", 3),
            planned("3", Some("s2"), "done", 8),
        ];
        let summary = SprintSummary::compute(&sprint("s1", 0), &tasks, "done");
        assert_eq!(summary.task_count, 2);
        assert_eq!(summary.total_points, 8);
        assert_eq!(summary.completed_points, 5);
        assert_eq!(summary.completed_tasks, 1);
    }

    #[test]
    fn test_summary_handles_large_point_values() {
        let tasks = vec![
            planned("1", Some("s1"), "done", u32::MAX),
            planned("2", Some("s1"), "done", u32::MAX),
        ];
        let summary = SprintSummary::compute(&sprint("s1", 0), &tasks, "done");
        assert_eq!(summary.total_points, 2 * u64::from(u32::MAX));
        assert_eq!(summary.completed_points, summary.total_points);
    }

    #[test]
    fn test_sort_sprints_by_start() {
        let mut sprints = vec![sprint("later", 10), sprint("sooner", 1)];
        sort_sprints(&mut sprints);
        assert_eq!(sprints[0].id, "sooner");
    }
}
