use chrono::{DateTime, NaiveDate, Utc};

use crate::task::Task;

/// Tasks due on the given calendar day (UTC)
pub fn tasks_due_on(tasks: &[Task], day: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.due_date.is_some_and(|due| due.date_naive() == day))
        .collect()
}

/// Open tasks whose due date has passed
pub fn overdue(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| !t.is_completed())
        .filter(|t| t.due_date.is_some_and(|due| due < now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskPriority, TaskStatus};
    use chrono::TimeZone;

    fn task(id: &str, due: Option<DateTime<Utc>>, status: TaskStatus) -> Task {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Task {
            id: id.into(),
            owner_id: "u1".into(),
            title: id.into(),
            notes: None,
            status,
            priority: TaskPriority::Low,
            due_date: due,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_tasks_due_on() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let tasks = vec![
            task("morning", Some(Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()), TaskStatus::Pending),
            task("late", Some(Utc.with_ymd_and_hms(2024, 5, 10, 23, 59, 59).unwrap()), TaskStatus::Completed),
            task("next", Some(Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap()), TaskStatus::Pending),
            task("undated", None, TaskStatus::Pending),
        ];
        let due: Vec<&str> = tasks_due_on(&tasks, day).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(due, vec!["morning", "late"]);
    }

    #[test]
    fn test_overdue() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let earlier = Some(Utc.with_ymd_and_hms(2024, 5, 9, 0, 0, 0).unwrap());
        let later = Some(Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap());
        let tasks = vec![
            task("late", earlier, TaskStatus::Pending),
            task("late-but-done", earlier, TaskStatus::Completed),
            task("in-time", later, TaskStatus::InProgress),
            task("undated", None, TaskStatus::Pending),
        ];
        let ids: Vec<&str> = overdue(&tasks, now).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["late"]);
    }
}
