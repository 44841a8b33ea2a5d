//! Identity-scoped task cache
//!
//! Mirrors the signed-in identity's slice of the remote collection. Every
//! read and mutation first checks the identity provider, so the cache never
//! outlives the identity it was loaded for. Mutations go to the remote first;
//! the cache only ever holds records the remote has confirmed.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::identity::{Identity, IdentityProvider};
use crate::task::{
    insert_row, patch_to_row, task_from_row, validate_title, NewTask, Task, TaskPatch, TaskRemote,
};
use crate::Result;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle of the cache as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorePhase {
    /// Nothing loaded for the bound identity yet
    Uninitialized,
    Loading,
    Ready,
}

/// Point-in-time copy of the store's observable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub phase: StorePhase,
}

/// Change notifications for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Cache discarded because the bound identity changed
    Reset,
    Loaded { count: usize },
    FetchFailed { message: String },
    Added(Task),
    Updated(Task),
    Removed { id: String },
}

struct StoreState {
    owner: Option<Identity>,
    tasks: Vec<Task>,
    loading: bool,
    error: Option<String>,
    phase: StorePhase,
    /// Bumped whenever the bound identity changes
    scope: u64,
    /// Bumped by every fetch; only the newest one may write
    fetch_seq: u64,
}

impl StoreState {
    fn new() -> Self {
        Self {
            owner: None,
            tasks: Vec::new(),
            loading: false,
            error: None,
            phase: StorePhase::Uninitialized,
            scope: 0,
            fetch_seq: 0,
        }
    }

    /// Point the state at `identity`
    ///
    /// When the principal differs from the bound one the cache is discarded
    /// and true is returned. A new session for the same principal only
    /// refreshes the stored identity.
    fn rebind(&mut self, identity: Option<Identity>) -> bool {
        let same = match (&self.owner, &identity) {
            (Some(current), Some(next)) => current.same_principal(next),
            (None, None) => true,
            _ => false,
        };
        if same {
            self.owner = identity;
            return false;
        }

        info!(
            "Rebinding task store: {:?} -> {:?}",
            self.owner.as_ref().map(|o| o.id.as_str()),
            identity.as_ref().map(|i| i.id.as_str())
        );
        self.owner = identity;
        self.tasks.clear();
        self.loading = false;
        self.error = None;
        self.phase = StorePhase::Uninitialized;
        self.scope += 1;
        true
    }
}

/// Shared handle to the task cache; clones see the same state
#[derive(Clone)]
pub struct TaskStore {
    remote: Arc<dyn TaskRemote>,
    identity: Arc<dyn IdentityProvider>,
    state: Arc<RwLock<StoreState>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl TaskStore {
    pub fn new(remote: Arc<dyn TaskRemote>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            identity,
            state: Arc::new(RwLock::new(StoreState::new())),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn identity_provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Lock the state after pointing it at the provider's current identity
    ///
    /// With `load` set, a reset to a signed-in identity also starts loading
    /// that identity's tasks in the background.
    async fn lock_current(&self, load: bool) -> RwLockWriteGuard<'_, StoreState> {
        let mut state = self.state.write().await;
        if state.rebind(self.identity.current_identity()) {
            self.emit(StoreEvent::Reset);
            if load && state.owner.is_some() {
                self.spawn_fetch();
            }
        }
        state
    }

    pub(crate) fn spawn_fetch(&self) {
        let store = self.clone();
        tokio::spawn(async move { store.fetch_all().await });
    }

    /// Bring the cache in line with the provider's current identity
    ///
    /// Returns true when the cache was just reset for a signed-in identity and
    /// still has to be loaded. Nothing is loaded here.
    pub(crate) async fn sync_identity(&self) -> bool {
        let mut state = self.state.write().await;
        let changed = state.rebind(self.identity.current_identity());
        let signed_in = state.owner.is_some();
        drop(state);
        if changed {
            self.emit(StoreEvent::Reset);
        }
        changed && signed_in
    }

    pub async fn snapshot(&self) -> TaskSnapshot {
        let state = self.lock_current(true).await;
        TaskSnapshot {
            tasks: state.tasks.clone(),
            loading: state.loading,
            error: state.error.clone(),
            phase: state.phase,
        }
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.lock_current(true).await.tasks.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        let state = self.lock_current(true).await;
        state.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.lock_current(true).await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.lock_current(true).await.error.clone()
    }

    pub async fn phase(&self) -> StorePhase {
        self.lock_current(true).await.phase
    }

    pub async fn owner(&self) -> Option<Identity> {
        self.lock_current(true).await.owner.clone()
    }

    /// Reload the whole list for the bound identity
    ///
    /// Failures land in the error slot rather than being returned. A response
    /// is dropped if a newer fetch was issued or the identity changed while it
    /// was in flight.
    pub async fn fetch_all(&self) {
        let (owner_id, scope, seq) = {
            let mut state = self.lock_current(false).await;
            let Some(owner_id) = state.owner.as_ref().map(|o| o.id.clone()) else {
                state.tasks.clear();
                state.loading = false;
                state.error = None;
                return;
            };
            state.fetch_seq += 1;
            state.loading = true;
            state.phase = StorePhase::Loading;
            (owner_id, state.scope, state.fetch_seq)
        };

        debug!("Fetching tasks for {}", owner_id);
        let result = match self.remote.list(&owner_id).await {
            Ok(rows) => rows.into_iter().map(task_from_row).collect::<Result<Vec<_>>>(),
            Err(e) => Err(e),
        };

        let mut state = self.lock_current(true).await;
        if state.scope != scope || state.fetch_seq != seq {
            debug!("Dropping stale fetch response for {}", owner_id);
            return;
        }
        state.loading = false;
        state.phase = StorePhase::Ready;
        let event = match result {
            Ok(tasks) => {
                let count = tasks.len();
                state.tasks = tasks;
                state.error = None;
                StoreEvent::Loaded { count }
            }
            Err(e) => {
                warn!("Failed to fetch tasks for {}: {}", owner_id, e);
                let message = e.to_string();
                state.tasks.clear();
                state.error = Some(message.clone());
                StoreEvent::FetchFailed { message }
            }
        };
        drop(state);
        self.emit(event);
    }

    async fn bound_scope(&self) -> Result<(String, u64)> {
        let state = self.lock_current(true).await;
        let owner = state
            .owner
            .as_ref()
            .ok_or_else(|| Error::Unauthorized("No identity is signed in".into()))?;
        Ok((owner.id.clone(), state.scope))
    }

    /// Create a task and prepend the confirmed record
    pub async fn add(&self, input: NewTask) -> Result<Task> {
        let title = validate_title(&input.title)?;
        let (owner_id, scope) = self.bound_scope().await?;
        let input = NewTask { title, ..input };

        let row = self
            .remote
            .insert(insert_row(&owner_id, &input))
            .await
            .inspect_err(|e| warn!("Failed to add task: {}", e))?;
        let created = task_from_row(row)?;

        let mut state = self.lock_current(true).await;
        if state.scope == scope {
            state.tasks.insert(0, created.clone());
            drop(state);
            self.emit(StoreEvent::Added(created.clone()));
        }
        Ok(created)
    }

    /// Apply a partial update and replace the cached record with the result
    ///
    /// An id that is not cached still gets updated remotely; the cache is
    /// left alone in that case.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validated()?;
        let (owner_id, scope) = self.bound_scope().await?;

        let row = self
            .remote
            .update(&owner_id, id, patch_to_row(&patch))
            .await
            .inspect_err(|e| warn!("Failed to update task {}: {}", id, e))?;
        let updated = task_from_row(row)?;

        let mut state = self.lock_current(true).await;
        if state.scope != scope {
            return Ok(updated);
        }
        if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == id) {
            *slot = updated.clone();
            drop(state);
            self.emit(StoreEvent::Updated(updated.clone()));
        }
        Ok(updated)
    }

    /// Delete a task, dropping it from the cache once the remote confirms
    pub async fn remove(&self, id: &str) -> Result<()> {
        let (owner_id, scope) = self.bound_scope().await?;

        self.remote
            .delete(&owner_id, id)
            .await
            .inspect_err(|e| warn!("Failed to delete task {}: {}", id, e))?;

        let mut state = self.lock_current(true).await;
        if state.scope != scope {
            return Ok(());
        }
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        let removed = state.tasks.len() != before;
        drop(state);
        if removed {
            self.emit(StoreEvent::Removed { id: id.to_string() });
        }
        Ok(())
    }

    /// Flip a cached task between completed and pending
    pub async fn toggle_status(&self, id: &str) -> Result<Task> {
        let status = {
            let state = self.lock_current(true).await;
            state
                .tasks
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.status)
                .ok_or_else(|| Error::NotFound(format!("Task {}", id)))?
        };
        self.update(id, TaskPatch::status(status.toggled())).await
    }
}
