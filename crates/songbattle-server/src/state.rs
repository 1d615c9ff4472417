use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use songbattle_core::{Catalog, MatchConfig};

/// Shared application state.
pub struct AppState<S> {
    pub store: S,
    pub catalog: Catalog,
    pub config: MatchConfig,
    /// One lock per session id; requests for a session run one at a time, in arrival order.
    pub session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S> AppState<S> {
    pub fn new(store: S, catalog: Catalog, config: MatchConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            session_locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to a session.
    pub async fn lock_session(&self, session: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .session_locks
            .entry(session.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody is holding or waiting on. Returns how many were removed.
    pub fn prune_session_locks(&self) -> usize {
        let before = self.session_locks.len();
        self.session_locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.session_locks.len()
    }
}
