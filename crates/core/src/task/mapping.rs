//! Translation between cached tasks and rows of the remote collection
//!
//! The remote collection names the owner `user_id`, stores the due date as
//! an ISO-8601 string under `due_date` and wants explicit `null` for cleared
//! optional columns. Everything else maps one to one.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::model::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::error::Error;
use crate::Result;

/// A row as stored in the remote collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the remote assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTaskRow {
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
}

/// Update payload; absent fields are left out of the body entirely
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatchRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
}

/// Render a due date the way the remote column stores it
pub fn format_due_date(due_date: &DateTime<Utc>) -> String {
    due_date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a due date given as an RFC 3339 timestamp or a bare `YYYY-MM-DD`
///
/// Bare dates are taken as midnight UTC.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::Validation(format!("Malformed due date: '{}'", raw)))
}

pub fn task_to_row(task: &Task) -> TaskRow {
    TaskRow {
        id: task.id.clone(),
        user_id: task.owner_id.clone(),
        title: task.title.clone(),
        notes: task.notes.clone(),
        status: task.status,
        priority: task.priority,
        due_date: task.due_date.as_ref().map(format_due_date),
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

/// Convert a remote row into a cached task
///
/// A due date the remote sent in an unreadable format makes the whole row
/// unusable, which counts as a malformed response.
pub fn task_from_row(row: TaskRow) -> Result<Task> {
    let due_date = match row.due_date.as_deref() {
        Some(raw) => Some(parse_due_date(raw).map_err(|_| {
            Error::Transport(format!(
                "Malformed due_date '{}' on task {}",
                raw, row.id
            ))
        })?),
        None => None,
    };

    Ok(Task {
        id: row.id,
        owner_id: row.user_id,
        title: row.title,
        notes: row.notes,
        status: row.status,
        priority: row.priority,
        due_date,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Build the insert payload for `owner_id`, forcing the pending status
pub fn insert_row(owner_id: &str, input: &NewTask) -> NewTaskRow {
    NewTaskRow {
        user_id: owner_id.to_string(),
        title: input.title.clone(),
        notes: input.notes.clone(),
        status: TaskStatus::Pending,
        priority: input.priority.unwrap_or_default(),
        due_date: input.due_date.as_ref().map(format_due_date),
    }
}

pub fn patch_to_row(patch: &TaskPatch) -> TaskPatchRow {
    TaskPatchRow {
        title: patch.title.clone(),
        notes: patch.notes.clone(),
        status: patch.status,
        priority: patch.priority,
        due_date: patch
            .due_date
            .as_ref()
            .map(|due| due.as_ref().map(format_due_date)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_task() -> Task {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        Task {
            id: "t1".into(),
            owner_id: "u1".into(),
            title: "Buy milk".into(),
            notes: Some("semi-skimmed".into()),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            due_date: Some(Utc.with_ymd_and_hms(2024, 3, 5, 17, 0, 0).unwrap()),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_round_trip_through_row() {
        let task = sample_task();
        let back = task_from_row(task_to_row(&task)).unwrap();
        assert_eq!(back, task);

        let mut bare = sample_task();
        bare.notes = None;
        bare.due_date = None;
        assert_eq!(task_from_row(task_to_row(&bare)).unwrap(), bare);
    }

    #[test]
    fn test_round_trip_keeps_subsecond_precision() {
        let mut task = sample_task();
        task.due_date = Some(Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap());
        assert_eq!(task_from_row(task_to_row(&task)).unwrap(), task);
    }

    #[test]
    fn test_row_uses_remote_column_names() {
        let value = serde_json::to_value(task_to_row(&sample_task())).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["due_date"], "2024-03-05T17:00:00Z");
        assert_eq!(value["status"], "in_progress");
        assert!(value.get("dueDate").is_none());
    }

    #[test]
    fn test_insert_row_sends_explicit_nulls() {
        let row = insert_row("u1", &NewTask::new("Walk dog"));
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": "u1",
                "title": "Walk dog",
                "notes": null,
                "status": "pending",
                "priority": "medium",
                "due_date": null,
            })
        );
    }

    #[test]
    fn test_patch_row_distinguishes_clear_from_untouched() {
        let patch = TaskPatch::status(TaskStatus::Completed)
            .with_notes(None)
            .with_due_date(None);
        let value = serde_json::to_value(patch_to_row(&patch)).unwrap();
        assert_eq!(
            value,
            json!({ "status": "completed", "notes": null, "due_date": null })
        );

        let value = serde_json::to_value(patch_to_row(&TaskPatch::default())).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_parse_due_date_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 12, 24, 0, 0, 0).unwrap();
        assert_eq!(parse_due_date("2024-12-24").unwrap(), midnight);
        assert_eq!(parse_due_date("2024-12-24T00:00:00.000Z").unwrap(), midnight);
        assert_eq!(parse_due_date("2024-12-24T02:00:00+02:00").unwrap(), midnight);
        assert!(matches!(parse_due_date("next tuesday"), Err(Error::Validation(_))));
        assert!(matches!(parse_due_date("2024-13-01"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_malformed_remote_due_date_is_rejected() {
        let mut row = task_to_row(&sample_task());
        row.due_date = Some("soon".into());
        assert!(matches!(task_from_row(row), Err(Error::Transport(_))));
    }

    #[test]
    fn test_row_missing_status_and_priority_uses_defaults() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "t9",
            "user_id": "u1",
            "title": "Legacy row",
            "notes": null,
            "due_date": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        let task = task_from_row(row).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
    }
}
