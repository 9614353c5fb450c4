//! Composition root.
//!
//! Assembles the manager, relevance engine, and sync service from the
//! configuration and a storage backend. Hosts with a feed-capable backend
//! (e.g. the shared in-memory hub) get cross-context sync; the
//! directory-backed default has no feed, so sync stays inert there.

use std::sync::Arc;
use std::time::Duration;

use scholia_core::relevance::EmbeddingCache;
use scholia_core::storage::{ChangeFeed, KeyValueStorage, StorageErrorSink};
use scholia_core::{Result, ScholiaError};
use scholia_infrastructure::{DirStorage, HttpEmbeddingProvider, ScholiaConfig};

use crate::manager::SessionManager;
use crate::relevance::RelevanceEngine;
use crate::sync::{ListChangedCallback, SyncService};

/// The assembled application services.
pub struct ScholiaRuntime {
    pub manager: Arc<SessionManager>,
    pub relevance: Arc<RelevanceEngine>,
    pub sync: SyncService,
}

/// Builds the runtime over the default directory-backed storage.
///
/// Must be called within a tokio runtime; the debounce timers and sync
/// task run on it.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be prepared.
pub fn bootstrap(
    config: &ScholiaConfig,
    error_sink: Option<StorageErrorSink>,
) -> Result<ScholiaRuntime> {
    let storage = match &config.storage_dir {
        Some(dir) => DirStorage::new(dir),
        None => DirStorage::default_location(),
    }
    .map_err(|err| ScholiaError::internal(err.to_string()))?;

    Ok(bootstrap_with_storage(
        config,
        Arc::new(storage),
        None,
        error_sink,
        None,
    ))
}

/// Builds the runtime over an explicit storage backend, wiring the sync
/// service when a change feed is supplied and `config.sync_enabled` holds.
pub fn bootstrap_with_storage(
    config: &ScholiaConfig,
    storage: Arc<dyn KeyValueStorage>,
    feed: Option<&dyn ChangeFeed>,
    error_sink: Option<StorageErrorSink>,
    on_list_changed: Option<ListChangedCallback>,
) -> ScholiaRuntime {
    let manager = Arc::new(SessionManager::new(
        storage,
        error_sink,
        Duration::from_millis(config.save_debounce_ms),
    ));

    let cache = Arc::new(EmbeddingCache::new());
    let provider = Arc::new(HttpEmbeddingProvider::new(&config.embedding));
    let relevance = Arc::new(RelevanceEngine::new(
        cache,
        provider,
        Duration::from_millis(config.relevance_debounce_ms),
    ));

    let sync = match feed {
        Some(feed) => SyncService::start(
            config.sync_enabled,
            feed,
            Arc::clone(&manager),
            on_list_changed,
        ),
        None => SyncService::disabled(),
    };

    ScholiaRuntime {
        manager,
        relevance,
        sync,
    }
}
