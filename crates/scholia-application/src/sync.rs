//! Cross-context session reconciliation.
//!
//! Another execution context sharing the same storage (another tab, another
//! process over the same backend) may mutate the active session or the
//! session directory. This service watches the storage change feed and
//! reconciles local state; it never observes self-originated writes because
//! the feed contract excludes them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use scholia_core::session::Session;
use scholia_core::storage::{ChangeFeed, StorageChange};

use crate::manager::SessionManager;
use crate::store::SESSION_LIST_KEY;

/// Callback invoked when the session directory changes externally. The
/// subscriber re-reads the directory in full; no diffing is performed.
pub type ListChangedCallback = Arc<dyn Fn() + Send + Sync>;

/// Watches a [`ChangeFeed`] and reconciles the session manager.
pub struct SyncService {
    task: Option<JoinHandle<()>>,
}

impl SyncService {
    /// Starts the reconciliation task.
    ///
    /// When `enabled` is false (single-context deployments, tests) no task
    /// is spawned and the service is inert.
    pub fn start(
        enabled: bool,
        feed: &dyn ChangeFeed,
        manager: Arc<SessionManager>,
        on_list_changed: Option<ListChangedCallback>,
    ) -> Self {
        if !enabled {
            return Self { task: None };
        }

        let mut changes = feed.subscribe();
        let task = tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                Self::handle_change(&manager, on_list_changed.as_ref(), change).await;
            }
        });
        Self { task: Some(task) }
    }

    /// An inert service, equivalent to `start(false, ..)`.
    pub fn disabled() -> Self {
        Self { task: None }
    }

    /// Whether the reconciliation task is running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stops the reconciliation task.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    async fn handle_change(
        manager: &SessionManager,
        on_list_changed: Option<&ListChangedCallback>,
        change: StorageChange,
    ) {
        if change.key == SESSION_LIST_KEY {
            debug!("session directory changed externally");
            if let Some(callback) = on_list_changed {
                callback();
            }
            return;
        }

        let Some(active_key) = manager.active_session_key().await else {
            return;
        };
        if change.key != active_key {
            return;
        }

        match change.new_value {
            Some(payload) => match serde_json::from_str::<Session>(&payload) {
                Ok(session) => manager.reconcile_external(session).await,
                Err(err) => {
                    warn!(%err, "ignoring unparseable external session update");
                }
            },
            // The active session was deleted in another context. Deliberate
            // no-op: this tab keeps its in-memory copy rather than guessing
            // whether to force-switch.
            None => {}
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.stop();
    }
}
