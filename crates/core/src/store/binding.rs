//! Keeps a task store loaded for the provider's current identity
//!
//! The store already checks the provider on every call; this subscription
//! makes sure a change is acted on even when nothing reads the store.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::task_store::TaskStore;
use crate::identity::Identity;

/// Running subscription; dropping it stops following identity changes
pub struct IdentityBinding {
    handle: JoinHandle<()>,
}

impl IdentityBinding {
    /// Bind to the store's current identity, wait for the initial load,
    /// then follow every later change in the background
    pub async fn start(store: TaskStore) -> Self {
        let mut rx = store.identity_provider().subscribe();
        let _ = rx.borrow_and_update();
        if store.sync_identity().await {
            store.fetch_all().await;
        }

        let handle = tokio::spawn(follow(store, rx));
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for IdentityBinding {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn follow(store: TaskStore, mut rx: watch::Receiver<Option<Identity>>) {
    while rx.changed().await.is_ok() {
        // Loads run on their own so a slow fetch cannot hold up the next change
        if store.sync_identity().await {
            store.spawn_fetch();
        }
    }
    debug!("Identity provider closed, binding stopped");
}
