//! Bounded activity log types.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Maximum number of activity events retained per session. Oldest events
/// are evicted first.
pub const MAX_ACTIVITY_COUNT: usize = 10;

/// The closed set of recordable user activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
    /// A search was performed.
    Search,
    /// A paper was added to the selection.
    PaperSelected,
    /// A paper was excluded from the candidate set.
    PaperExcluded,
    /// A previously selected or excluded paper was restored.
    PaperRestored,
    /// An AI analysis finished for a paper.
    AnalysisDone,
    /// A translation finished for a paper.
    TranslationDone,
    /// The user sent a chat message.
    ChatUser,
    /// The assistant sent a chat message.
    ChatAssistant,
    /// The session was created.
    NoteCreated,
    /// The session was renamed.
    NoteRenamed,
}

/// An immutable, append-only log entry.
///
/// `data` is a free-form attribute bag scoped to the event kind (e.g. the
/// query string for a search, the paper id for a selection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Unique event identifier (UUID format)
    pub id: String,
    /// What happened
    pub kind: ActivityKind,
    /// Timestamp when the event was recorded (RFC 3339 format)
    pub timestamp: String,
    /// Kind-scoped attributes
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ActivityEvent {
    /// Creates a new event stamped with the current time.
    pub fn new(kind: ActivityKind, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }
}
