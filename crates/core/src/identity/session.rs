//! Watch-channel backed identity provider

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::{Identity, IdentityProvider};

/// Holds the current session and notifies subscribers when it changes
#[derive(Clone)]
pub struct SessionIdentity {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentity {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the session; returns whether subscribers were notified
    ///
    /// Setting the value already held is not a change.
    pub fn set(&self, identity: Option<Identity>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == identity {
                return false;
            }
            info!(
                "Identity changed: {:?} -> {:?}",
                current.as_ref().map(|i| i.id.as_str()),
                identity.as_ref().map(|i| i.id.as_str())
            );
            *current = identity;
            true
        })
    }

    pub fn clear(&self) -> bool {
        self.set(None)
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}
