//! Shared in-memory storage hub with per-context handles.
//!
//! Models the contract of a browser-origin local store shared by several
//! tabs: every context reads and writes the same map, and each context's
//! change feed observes mutations made by *other* contexts only. Used as
//! the storage backend in tests and single-process deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use scholia_core::storage::{ChangeFeed, KeyValueStorage, StorageChange, StorageError};

/// Capacity of the internal broadcast channel; a lagging subscriber drops
/// the oldest notifications rather than blocking writers.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

struct Hub {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    changes: broadcast::Sender<(u64, StorageChange)>,
    next_context: AtomicU64,
}

impl Hub {
    fn total_bytes(entries: &HashMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

/// A process-wide storage hub. Handles minted by [`context`]
/// (`SharedMemoryStorage::context`) share the same underlying map.
#[derive(Clone)]
pub struct SharedMemoryStorage {
    hub: Arc<Hub>,
}

impl SharedMemoryStorage {
    /// Creates an unbounded hub.
    pub fn new() -> Self {
        Self::with_quota(None)
    }

    /// Creates a hub that rejects writes once the combined size of keys and
    /// values would exceed `quota_bytes`. Used to exercise the
    /// quota-exceeded path.
    pub fn with_quota(quota_bytes: Option<usize>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            hub: Arc::new(Hub {
                entries: Mutex::new(HashMap::new()),
                quota_bytes,
                changes,
                next_context: AtomicU64::new(0),
            }),
        }
    }

    /// Mints a new context handle. Each handle has a distinct origin, so
    /// its feed never echoes its own writes.
    pub fn context(&self) -> ContextStorage {
        ContextStorage {
            hub: Arc::clone(&self.hub),
            origin: self.hub.next_context.fetch_add(1, Ordering::SeqCst),
        }
    }
}

impl Default for SharedMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// One execution context's view of a [`SharedMemoryStorage`].
pub struct ContextStorage {
    hub: Arc<Hub>,
    origin: u64,
}

impl KeyValueStorage for ContextStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.hub
            .entries
            .lock()
            .expect("storage hub lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        {
            let mut entries = self.hub.entries.lock().expect("storage hub lock poisoned");
            if let Some(quota) = self.hub.quota_bytes {
                let existing = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
                let projected =
                    Hub::total_bytes(&entries) - existing + key.len() + value.len();
                if projected > quota {
                    return Err(StorageError::QuotaExceeded(format!(
                        "write of {} bytes exceeds quota of {} bytes",
                        key.len() + value.len(),
                        quota
                    )));
                }
            }
            entries.insert(key.to_string(), value.to_string());
        }
        // Nobody listening is fine.
        let _ = self.hub.changes.send((
            self.origin,
            StorageChange {
                key: key.to_string(),
                new_value: Some(value.to_string()),
            },
        ));
        Ok(())
    }

    fn remove(&self, key: &str) {
        let removed = self
            .hub
            .entries
            .lock()
            .expect("storage hub lock poisoned")
            .remove(key)
            .is_some();
        if removed {
            let _ = self.hub.changes.send((
                self.origin,
                StorageChange {
                    key: key.to_string(),
                    new_value: None,
                },
            ));
        }
    }
}

impl ChangeFeed for ContextStorage {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<StorageChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut source = self.hub.changes.subscribe();
        let origin = self.origin;
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok((change_origin, change)) => {
                        if change_origin == origin {
                            continue;
                        }
                        if tx.send(change).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "change feed subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn contexts_share_entries() {
        let hub = SharedMemoryStorage::new();
        let a = hub.context();
        let b = hub.context();

        a.set("key", "value").unwrap();
        assert_eq!(b.get("key"), Some("value".to_string()));

        b.remove("key");
        assert_eq!(a.get("key"), None);
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let hub = SharedMemoryStorage::with_quota(Some(16));
        let ctx = hub.context();

        ctx.set("k", "small").unwrap();
        let err = ctx.set("key2", "a much larger value").unwrap_err();
        assert_eq!(err.code(), "quota_exceeded");

        // The failed write must not clobber existing data.
        assert_eq!(ctx.get("k"), Some("small".to_string()));
    }

    #[tokio::test]
    async fn feed_delivers_external_writes_only() {
        let hub = SharedMemoryStorage::new();
        let a = hub.context();
        let b = hub.context();
        let mut feed = a.subscribe();

        a.set("self", "write").unwrap();
        b.set("other", "write").unwrap();

        let change = tokio::time::timeout(Duration::from_millis(200), feed.recv())
            .await
            .expect("change should arrive")
            .expect("feed open");
        assert_eq!(change.key, "other");
        assert_eq!(change.new_value, Some("write".to_string()));

        // The self-originated write must never surface.
        let extra = tokio::time::timeout(Duration::from_millis(50), feed.recv()).await;
        assert!(extra.is_err());
    }

    #[tokio::test]
    async fn feed_reports_removals_with_no_value() {
        let hub = SharedMemoryStorage::new();
        let a = hub.context();
        let b = hub.context();
        let mut feed = a.subscribe();

        b.set("key", "value").unwrap();
        b.remove("key");

        let first = feed.recv().await.unwrap();
        assert_eq!(first.new_value, Some("value".to_string()));
        let second = feed.recv().await.unwrap();
        assert_eq!(second.new_value, None);
    }
}
