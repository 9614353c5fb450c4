//! Session persistence over key-value storage.

use std::sync::Arc;

use tracing::warn;

use scholia_core::session::Session;
use scholia_core::storage::{KeyValueStorage, StorageError, StorageErrorSink};

/// Prefix under which session bodies are stored.
pub const SESSION_KEY_PREFIX: &str = "scholia.session.";

/// Key holding the serialized session directory.
pub const SESSION_LIST_KEY: &str = "scholia.sessions";

/// Key holding the id of the current session.
pub const CURRENT_SESSION_KEY: &str = "scholia.current-session";

/// Storage key for a session body.
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, session_id)
}

/// Session CRUD against a [`KeyValueStorage`] backend.
///
/// Every operation degrades gracefully: reads return `None` on missing or
/// malformed data, writes report failures through the error sink. Callers'
/// control flow is never interrupted by storage trouble, at the documented
/// cost that a failed write loses data until the next successful one.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    error_sink: Option<StorageErrorSink>,
}

impl SessionStore {
    /// Creates a store over `storage`, reporting degraded failures to
    /// `error_sink` when one is supplied.
    pub fn new(storage: Arc<dyn KeyValueStorage>, error_sink: Option<StorageErrorSink>) -> Self {
        Self {
            storage,
            error_sink,
        }
    }

    fn report(&self, error: &StorageError) {
        warn!(code = error.code(), %error, "session storage failure");
        if let Some(sink) = &self.error_sink {
            sink(error);
        }
    }

    /// Serializes `session` (with a refreshed `updated_at`) under its key,
    /// overwriting any prior value unconditionally.
    pub fn save_session(&self, session: &mut Session) {
        session.touch();
        let payload = match serde_json::to_string(session) {
            Ok(payload) => payload,
            Err(err) => {
                self.report(&StorageError::Unknown(err.to_string()));
                return;
            }
        };
        if let Err(err) = self.storage.set(&session_key(&session.id), &payload) {
            self.report(&err);
        }
    }

    /// Loads and deserializes a session body. Missing keys and malformed
    /// payloads both yield `None`; the latter is additionally reported.
    pub fn load_session(&self, session_id: &str) -> Option<Session> {
        let payload = self.storage.get(&session_key(session_id))?;
        match serde_json::from_str(&payload) {
            Ok(session) => Some(session),
            Err(err) => {
                self.report(&StorageError::Parse(format!(
                    "session {}: {}",
                    session_id, err
                )));
                None
            }
        }
    }

    /// Removes a session body. Idempotent.
    pub fn delete_session(&self, session_id: &str) {
        self.storage.remove(&session_key(session_id));
    }

    /// Reads the current-session pointer.
    pub fn load_current_id(&self) -> Option<String> {
        self.storage.get(CURRENT_SESSION_KEY)
    }

    /// Writes the current-session pointer.
    pub fn save_current_id(&self, session_id: &str) {
        if let Err(err) = self.storage.set(CURRENT_SESSION_KEY, session_id) {
            self.report(&err);
        }
    }

    /// Clears the current-session pointer.
    pub fn clear_current_id(&self) {
        self.storage.remove(CURRENT_SESSION_KEY);
    }
}
