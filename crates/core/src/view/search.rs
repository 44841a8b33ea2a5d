use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskStatus};

/// Status restriction applied on top of the text search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

fn matches_term(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .notes
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .contains(needle)
}

/// Tasks whose title or notes contain `term`, ignoring case, in list order
pub fn filter_by_search<'a>(tasks: &'a [Task], term: &str) -> Vec<&'a Task> {
    filter_tasks(tasks, term, StatusFilter::All)
}

/// Text search combined with a status filter
pub fn filter_tasks<'a>(tasks: &'a [Task], term: &str, status: StatusFilter) -> Vec<&'a Task> {
    let needle = term.to_lowercase();
    tasks
        .iter()
        .filter(|task| status.matches(task.status))
        .filter(|task| needle.is_empty() || matches_term(task, &needle))
        .collect()
}
