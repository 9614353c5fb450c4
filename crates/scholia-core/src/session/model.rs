//! The durable session record.

use serde::{Deserialize, Serialize};

use crate::session::activity::{ActivityEvent, ActivityKind, MAX_ACTIVITY_COUNT};
use crate::session::state::{SessionState, SessionStatePatch};
use crate::session::summary::SessionSummary;

/// Schema version written into new sessions. Never validated on load; it
/// exists so a future reader can branch on the stored shape.
pub const SESSION_SCHEMA_VERSION: &str = "1.0.0";

/// Name given to sessions the user has not named yet. The first recorded
/// search replaces it with the query text.
pub const DEFAULT_SESSION_NAME: &str = "Untitled research";

/// A user's saved research working-set: query, selections, chat, analyses,
/// plus the bounded activity log.
///
/// This is the pure domain record; persistence lives in
/// `scholia-application` on top of the storage traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format), immutable after creation
    pub id: String,
    /// Human-readable session name
    pub name: String,
    /// Timestamp when the session was created (RFC 3339 format)
    pub created_at: String,
    /// Timestamp of the last persisted mutation (RFC 3339 format)
    pub updated_at: String,
    /// Schema version tag written at creation
    pub schema_version: String,
    /// Working snapshot
    pub state: SessionState,
    /// Bounded activity log, oldest first
    #[serde(default)]
    pub activities: Vec<ActivityEvent>,
}

impl Session {
    /// Creates a fresh session with an empty state and a single
    /// `note_created` activity. Pure constructor; nothing is persisted.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let now = chrono::Utc::now().to_rfc3339();
        let mut session = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.clone(),
            created_at: now.clone(),
            updated_at: now,
            schema_version: SESSION_SCHEMA_VERSION.to_string(),
            state: SessionState::default(),
            activities: Vec::new(),
        };
        session.record_activity(ActivityKind::NoteCreated, serde_json::json!({ "name": name }));
        session
    }

    /// Appends an activity event, evicting the oldest entries beyond
    /// [`MAX_ACTIVITY_COUNT`].
    pub fn record_activity(&mut self, kind: ActivityKind, data: serde_json::Value) {
        self.activities.push(ActivityEvent::new(kind, data));
        if self.activities.len() > MAX_ACTIVITY_COUNT {
            let excess = self.activities.len() - MAX_ACTIVITY_COUNT;
            self.activities.drain(..excess);
        }
    }

    /// Shallow-merges a partial state patch; see
    /// [`SessionState::apply_patch`].
    pub fn apply_patch(&mut self, patch: SessionStatePatch) {
        self.state.apply_patch(patch);
    }

    /// Serializes the session as a transferable JSON document.
    pub fn export(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Parses a document produced by [`Session::export`].
    ///
    /// A fresh id is always minted so an imported session can never collide
    /// with an existing one. Malformed input yields `None`.
    pub fn import(text: &str) -> Option<Session> {
        let mut session: Session = serde_json::from_str(text).ok()?;
        session.id = uuid::Uuid::new_v4().to_string();
        Some(session)
    }

    /// Projects this session into its directory entry.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            paper_count: self.state.selected_papers.len(),
            activity_count: self.activities.len(),
            last_query: self.state.query.clone(),
        }
    }

    /// Refreshes `updated_at` to the current time. Called by the
    /// persistence layer on every save.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::test_paper;

    #[test]
    fn new_session_records_creation() {
        let session = Session::new("My research");

        assert_eq!(session.name, "My research");
        assert_eq!(session.schema_version, SESSION_SCHEMA_VERSION);
        assert_eq!(session.activities.len(), 1);
        assert_eq!(session.activities[0].kind, ActivityKind::NoteCreated);
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn activity_log_keeps_most_recent_ten_in_order() {
        let mut session = Session::new("bounded");
        // One note_created is already present; push 15 searches on top.
        for i in 0..15 {
            session.record_activity(ActivityKind::Search, serde_json::json!({ "seq": i }));
        }

        assert_eq!(session.activities.len(), MAX_ACTIVITY_COUNT);
        let seqs: Vec<i64> = session
            .activities
            .iter()
            .map(|e| e.data["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, vec![5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn export_import_round_trip_mints_fresh_id() {
        let mut session = Session::new("exported");
        session.state.query = "graph neural networks".to_string();
        session.state.select_paper(test_paper("p1", "One"));
        session.record_activity(
            ActivityKind::PaperSelected,
            serde_json::json!({ "paper_id": "p1" }),
        );

        let document = session.export();
        let imported = Session::import(&document).expect("import should succeed");

        assert_ne!(imported.id, session.id);
        assert_eq!(imported.state, session.state);
        assert_eq!(imported.activities, session.activities);
        assert_eq!(imported.name, session.name);
    }

    #[test]
    fn import_rejects_malformed_documents() {
        assert!(Session::import("not json").is_none());
        assert!(Session::import("{\"id\": 42}").is_none());
    }

    #[test]
    fn summary_projects_counts_and_query() {
        let mut session = Session::new("projected");
        session.state.query = "diffusion models".to_string();
        session.state.select_paper(test_paper("p1", "One"));
        session.state.select_paper(test_paper("p2", "Two"));

        let summary = session.summary();
        assert_eq!(summary.id, session.id);
        assert_eq!(summary.paper_count, 2);
        assert_eq!(summary.activity_count, 1);
        assert_eq!(summary.last_query, "diffusion models");
    }
}
