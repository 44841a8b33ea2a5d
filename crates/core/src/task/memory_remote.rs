//! In-memory remote collection
//!
//! Behaves like the hosted collection (owner checks, server-side title
//! validation, remote-assigned ids and timestamps) without a network. It also
//! carries a few knobs for driving the task store through failures and
//! overlapping requests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::mapping::{NewTaskRow, TaskPatchRow, TaskRow};
use super::remote::TaskRemote;
use crate::{Error, Result};

/// Remote calls whose response can be held back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeldCall {
    List,
    Insert,
    Update,
}

pub struct InMemoryTaskRemote {
    rows: RwLock<HashMap<String, TaskRow>>,
    /// Last timestamp handed out; keeps timestamps strictly increasing
    clock: Mutex<DateTime<Utc>>,
    calls: AtomicUsize,
    fail_next: Mutex<Option<Error>>,
    gates: Mutex<HashMap<HeldCall, oneshot::Receiver<()>>>,
}

impl Default for InMemoryTaskRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskRemote {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            calls: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Number of remote calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next call, whatever it is, fail with `error`
    pub async fn fail_next(&self, error: Error) {
        *self.fail_next.lock().await = Some(error);
    }

    /// Hold the response of the next `call` until the returned sender fires
    /// or is dropped
    ///
    /// The call does its work when it arrives: a held list reflects the
    /// collection at that moment, a held insert or update is already stored.
    pub async fn hold_next(&self, call: HeldCall) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.insert(call, rx);
        tx
    }

    /// Put a row straight into the collection, bypassing the call counter
    pub async fn seed(&self, row: TaskRow) {
        self.rows.write().await.insert(row.id.clone(), row);
    }

    /// Current rows of one owner, newest first
    pub async fn rows_for(&self, owner_id: &str) -> Vec<TaskRow> {
        let rows = self.rows.read().await;
        let mut owned: Vec<TaskRow> = rows
            .values()
            .filter(|row| row.user_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned
    }

    async fn begin_call(&self, op: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("In-memory remote: {}", op);
        match self.fail_next.lock().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn pass_gate(&self, call: HeldCall) {
        let gate = self.gates.lock().await.remove(&call);
        if let Some(gate) = gate {
            debug!("In-memory remote: holding {:?} response", call);
            let _ = gate.await;
        }
    }

    async fn apply_patch(&self, row: &mut TaskRow, patch: TaskPatchRow) {
        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(notes) = patch.notes {
            row.notes = notes;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(priority) = patch.priority {
            row.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            row.due_date = due_date;
        }
        row.updated_at = self.tick(Some(row.updated_at)).await;
    }

    async fn tick(&self, after: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let mut last = self.clock.lock().await;
        let floor = after.map_or(*last, |after| after.max(*last));
        let mut now = Utc::now();
        if now <= floor {
            now = floor + Duration::microseconds(1);
        }
        *last = now;
        now
    }
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title must not be empty".into()));
    }
    Ok(())
}

fn check_owner(row: &TaskRow, owner_id: &str) -> Result<()> {
    if row.user_id != owner_id {
        return Err(Error::Unauthorized(format!(
            "Task {} is not owned by {}",
            row.id, owner_id
        )));
    }
    Ok(())
}

#[async_trait]
impl TaskRemote for InMemoryTaskRemote {
    async fn list(&self, owner_id: &str) -> Result<Vec<TaskRow>> {
        self.begin_call("list").await?;
        let rows = self.rows_for(owner_id).await;
        self.pass_gate(HeldCall::List).await;
        Ok(rows)
    }

    async fn insert(&self, row: NewTaskRow) -> Result<TaskRow> {
        self.begin_call("insert").await?;
        check_title(&row.title)?;
        if row.user_id.is_empty() {
            return Err(Error::Unauthorized("Insert without an owner".into()));
        }

        let now = self.tick(None).await;
        let created = TaskRow {
            id: Uuid::new_v4().to_string(),
            user_id: row.user_id,
            title: row.title,
            notes: row.notes,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .write()
            .await
            .insert(created.id.clone(), created.clone());
        self.pass_gate(HeldCall::Insert).await;
        Ok(created)
    }

    async fn update(&self, owner_id: &str, id: &str, patch: TaskPatchRow) -> Result<TaskRow> {
        self.begin_call("update").await?;
        if let Some(title) = &patch.title {
            check_title(title)?;
        }

        let updated = {
            let mut rows = self.rows.write().await;
            let row = rows
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(format!("Task {}", id)))?;
            check_owner(row, owner_id)?;
            self.apply_patch(row, patch).await;
            row.clone()
        };
        self.pass_gate(HeldCall::Update).await;
        Ok(updated)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        self.begin_call("delete").await?;
        let mut rows = self.rows.write().await;
        let row = rows
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))?;
        check_owner(row, owner_id)?;
        rows.remove(id);
        Ok(())
    }
}
