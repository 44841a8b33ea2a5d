use serde::Serialize;

use crate::task::{Task, TaskStatus};

/// Dashboard counters
///
/// In-progress tasks count towards `total` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage of completed tasks, rounded half up, 0 for an empty list
    pub completion_rate: u8,
}

pub fn compute_stats(tasks: &[Task]) -> TaskStats {
    let total = tasks.len();
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let pending = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count();

    let completion_rate = if total == 0 {
        0
    } else {
        // round(100 * completed / total) in integers
        u8::try_from((200 * completed + total) / (2 * total)).unwrap_or(100)
    };

    TaskStats {
        total,
        completed,
        pending,
        completion_rate,
    }
}
