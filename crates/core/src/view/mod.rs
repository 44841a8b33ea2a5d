//! Derived views over a task list
//!
//! Pure functions, recomputed on every read.

mod calendar;
mod search;
mod stats;

pub use calendar::{overdue, tasks_due_on};
pub use search::{filter_by_search, filter_tasks, StatusFilter};
pub use stats::{compute_stats, TaskStats};
