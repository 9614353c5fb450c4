//! The bounded session directory.

use std::sync::Arc;

use tracing::warn;

use scholia_core::session::{Session, SessionSummary};
use scholia_core::storage::{KeyValueStorage, StorageError, StorageErrorSink};

use crate::store::SESSION_LIST_KEY;

/// Global cap on concurrently existing sessions.
pub const MAX_SESSION_COUNT: usize = 5;

/// Directory of [`SessionSummary`] entries, stored separately from full
/// session bodies under [`SESSION_LIST_KEY`], most-recent-first.
///
/// The directory is a cache of metadata, never a source of truth: entries
/// are regenerable from session bodies, and an entry whose body is missing
/// is purged lazily by the manager, never the reverse.
pub struct SessionIndex {
    storage: Arc<dyn KeyValueStorage>,
    error_sink: Option<StorageErrorSink>,
}

impl SessionIndex {
    /// Creates an index over `storage`.
    pub fn new(storage: Arc<dyn KeyValueStorage>, error_sink: Option<StorageErrorSink>) -> Self {
        Self {
            storage,
            error_sink,
        }
    }

    fn report(&self, error: &StorageError) {
        warn!(code = error.code(), %error, "session directory failure");
        if let Some(sink) = &self.error_sink {
            sink(error);
        }
    }

    /// Returns the directory, or an empty list on read/parse failure.
    pub fn list(&self) -> Vec<SessionSummary> {
        let Some(payload) = self.storage.get(SESSION_LIST_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&payload) {
            Ok(entries) => entries,
            Err(err) => {
                self.report(&StorageError::Parse(format!("session list: {}", err)));
                Vec::new()
            }
        }
    }

    fn write(&self, entries: &[SessionSummary]) {
        let payload = match serde_json::to_string(entries) {
            Ok(payload) => payload,
            Err(err) => {
                self.report(&StorageError::Unknown(err.to_string()));
                return;
            }
        };
        if let Err(err) = self.storage.set(SESSION_LIST_KEY, &payload) {
            self.report(&err);
        }
    }

    /// Upserts the entry for `session`: an existing entry is replaced in
    /// place (keeping its position), a new one is prepended.
    pub fn upsert(&self, session: &Session) {
        let mut entries = self.list();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == session.id) {
            *entry = session.summary();
        } else {
            entries.insert(0, session.summary());
        }
        self.write(&entries);
    }

    /// Refreshes the metadata of an existing entry in place. A no-op when
    /// the id is absent; it never creates.
    pub fn update_entry(&self, session: &Session) {
        let mut entries = self.list();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == session.id) {
            *entry = session.summary();
            self.write(&entries);
        }
    }

    /// Removes the entry for `session_id`. Idempotent.
    pub fn remove(&self, session_id: &str) {
        let mut entries = self.list();
        let before = entries.len();
        entries.retain(|e| e.id != session_id);
        if entries.len() != before {
            self.write(&entries);
        }
    }

    /// Renames an entry in place, refreshing its update timestamp.
    pub fn rename(&self, session_id: &str, new_name: &str) {
        let mut entries = self.list();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == session_id) {
            entry.name = new_name.to_string();
            entry.updated_at = chrono::Utc::now().to_rfc3339();
            self.write(&entries);
        }
    }

    /// Number of directory entries.
    pub fn count(&self) -> usize {
        self.list().len()
    }

    /// Whether another session may be created under the
    /// [`MAX_SESSION_COUNT`] cap.
    pub fn can_create(&self) -> bool {
        self.count() < MAX_SESSION_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholia_infrastructure::SharedMemoryStorage;

    fn index_over_memory() -> SessionIndex {
        let hub = SharedMemoryStorage::new();
        SessionIndex::new(Arc::new(hub.context()), None)
    }

    #[test]
    fn upsert_twice_keeps_one_entry_with_latest_metadata() {
        let index = index_over_memory();
        let mut session = Session::new("first name");
        index.upsert(&session);

        session.name = "second name".to_string();
        index.upsert(&session);

        let entries = index.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "second name");
    }

    #[test]
    fn new_entries_are_prepended() {
        let index = index_over_memory();
        let older = Session::new("older");
        let newer = Session::new("newer");
        index.upsert(&older);
        index.upsert(&newer);

        let entries = index.list();
        assert_eq!(entries[0].id, newer.id);
        assert_eq!(entries[1].id, older.id);
    }

    #[test]
    fn upsert_preserves_position_of_existing_entry() {
        let index = index_over_memory();
        let first = Session::new("first");
        let mut second = Session::new("second");
        index.upsert(&second);
        index.upsert(&first);

        second.name = "updated".to_string();
        index.upsert(&second);

        let entries = index.list();
        assert_eq!(entries[0].id, first.id);
        assert_eq!(entries[1].id, second.id);
        assert_eq!(entries[1].name, "updated");
    }

    #[test]
    fn update_entry_does_not_create() {
        let index = index_over_memory();
        let session = Session::new("unregistered");
        index.update_entry(&session);
        assert!(index.list().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let index = index_over_memory();
        let session = Session::new("removed");
        index.upsert(&session);

        index.remove(&session.id);
        index.remove(&session.id);
        assert!(index.list().is_empty());
    }

    #[test]
    fn rename_updates_name_and_timestamp() {
        let index = index_over_memory();
        let session = Session::new("before");
        index.upsert(&session);
        let old_updated_at = index.list()[0].updated_at.clone();

        index.rename(&session.id, "after");

        let entries = index.list();
        assert_eq!(entries[0].name, "after");
        assert!(entries[0].updated_at >= old_updated_at);
    }

    #[test]
    fn quota_check_tracks_count() {
        let index = index_over_memory();
        for i in 0..MAX_SESSION_COUNT {
            assert!(index.can_create());
            index.upsert(&Session::new(format!("session {}", i)));
        }
        assert_eq!(index.count(), MAX_SESSION_COUNT);
        assert!(!index.can_create());
    }

    #[test]
    fn corrupt_list_reads_as_empty() {
        let hub = SharedMemoryStorage::new();
        let ctx = hub.context();
        ctx.set(SESSION_LIST_KEY, "][").unwrap();
        let index = SessionIndex::new(Arc::new(hub.context()), None);

        assert!(index.list().is_empty());
    }
}
