/// Column partition of the visible projection.
use serde::Serialize;

use crate::types::{Board, Task};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub id: String,
    pub title: String,
    pub tasks: Vec<Task>,
}

impl ColumnView {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub board_id: String,
    pub title: String,
    pub columns: Vec<ColumnView>,
    /// Tasks whose status matches no column of the board.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unassigned: Vec<Task>,
}

impl BoardView {
    /// One column per board column (in `order`), each with the projection's
    /// tasks of that status in projection order.
    pub fn compose(board: &Board, projection: &[Task]) -> Self {
        let columns: Vec<ColumnView> = board
            .ordered_columns()
            .into_iter()
            .map(|col| ColumnView {
                id: col.id.clone(),
                title: col.title.clone(),
                tasks: projection
                    .iter()
                    .filter(|t| t.status == col.id)
                    .cloned()
                    .collect(),
            })
            .collect();

        let unassigned: Vec<Task> = projection
            .iter()
            .filter(|t| !board.has_column(&t.status))
            .cloned()
            .collect();
        if !unassigned.is_empty() {
            log::debug!(
                target: "sprintboard.view",
                "{} task(s) on board {} have a status with no column",
                unassigned.len(),
                board.id
            );
        }

        Self {
            board_id: board.id.clone(),
            title: board.title.clone(),
            columns,
            unassigned,
        }
    }

    pub fn column(&self, column_id: &str) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.id == column_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use chrono::Utc;

    fn board() -> Board {
        Board {
            id: "b1".into(),
            title: "Sprint board".into(),
            owner: "u1".into(),
            columns: vec![
                Column::new("done", "Done", 2),
                Column::new("todo", "To Do", 0),
                Column::new("in-progress", "In Progress", 1),
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_columns_follow_order_field() {
        let view = BoardView::compose(&board(), &[]);
        let ids: Vec<&str> = view.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "in-progress", "done"]);
    }

    #[test]
    fn test_unknown_status_goes_to_unassigned() {
        let tasks = vec![
            Task::new("1", "a", "todo"),
            Task::new("2", "b", "deleted-column"),
            Task::new("3", "c", "todo"),
        ];
        let view = BoardView::compose(&board(), &tasks);
        assert_eq!(view.column("todo").map(|c| c.count()), Some(2));
        assert_eq!(view.unassigned.len(), 1);
        assert_eq!(view.unassigned[0].id, "2");
    }
}
