//! Session lifecycle and debounced persistence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use scholia_core::debounce::Debouncer;
use scholia_core::paper::{Paper, PaperAnalysis};
use scholia_core::session::{
    ActivityKind, ChatMessage, DEFAULT_SESSION_NAME, MessageRole, Session, SessionStatePatch,
    SessionSummary, SortMode,
};
use scholia_core::storage::{KeyValueStorage, StorageErrorSink};

use crate::index::{MAX_SESSION_COUNT, SessionIndex};
use crate::store::{SessionStore, session_key};

/// Longest session name derived from a search query.
const MAX_DERIVED_NAME_CHARS: usize = 60;

/// Result of a session-creation attempt.
///
/// Hitting the session cap is not an error: it is a structured negative
/// result the caller branches on to show an actionable message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCreateOutcome {
    /// The session was created, persisted, and made current.
    Created(Session),
    /// The directory already holds `max` sessions; nothing was persisted.
    LimitReached { current: usize, max: usize },
}

impl SessionCreateOutcome {
    /// Whether a session was created.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// The orchestration layer over session persistence.
///
/// `SessionManager` is the only component that mutates the current session
/// in memory. Every mutation schedules a debounced persist so bursts of
/// rapid interaction (streaming chat tokens, quick selection changes)
/// collapse into a single write; lifecycle operations flush or cancel the
/// pending write explicitly.
pub struct SessionManager {
    store: Arc<SessionStore>,
    index: Arc<SessionIndex>,
    active: Arc<RwLock<Option<Session>>>,
    debouncer: Debouncer<Session>,
}

impl SessionManager {
    /// Creates a manager over `storage` with the given persist delay.
    ///
    /// No session is activated; call
    /// [`restore_last_session`](Self::restore_last_session) to pick up the
    /// stored pointer, or [`create_session`](Self::create_session) for a
    /// fresh one.
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        error_sink: Option<StorageErrorSink>,
        save_delay: Duration,
    ) -> Self {
        let store = Arc::new(SessionStore::new(
            Arc::clone(&storage),
            error_sink.clone(),
        ));
        let index = Arc::new(SessionIndex::new(storage, error_sink));

        let store_for_save = Arc::clone(&store);
        let index_for_save = Arc::clone(&index);
        let debouncer = Debouncer::new(save_delay, move |mut session: Session| {
            store_for_save.save_session(&mut session);
            index_for_save.update_entry(&session);
        });

        Self {
            store,
            index,
            active: Arc::new(RwLock::new(None)),
            debouncer,
        }
    }

    /// Attempts to restore the session the stored pointer names.
    ///
    /// Returns `None` when no pointer is stored or its body is missing; no
    /// session is auto-created in that case.
    pub async fn restore_last_session(&self) -> Option<Session> {
        let session_id = self.store.load_current_id()?;
        let session = self.store.load_session(&session_id)?;
        *self.active.write().await = Some(session.clone());
        Some(session)
    }

    /// Returns a snapshot of the active session, if any.
    pub async fn active_session(&self) -> Option<Session> {
        self.active.read().await.clone()
    }

    /// Returns the id of the active session, if any.
    pub async fn active_session_id(&self) -> Option<String> {
        self.active.read().await.as_ref().map(|s| s.id.clone())
    }

    /// Storage key of the active session's body, used by the sync service
    /// to recognize external updates.
    pub async fn active_session_key(&self) -> Option<String> {
        self.active_session_id().await.map(|id| session_key(&id))
    }

    /// Applies `mutation` to the active session and schedules the debounced
    /// persist. Returns `false` when no session is active.
    async fn mutate(&self, mutation: impl FnOnce(&mut Session)) -> bool {
        let mut active = self.active.write().await;
        let Some(session) = active.as_mut() else {
            return false;
        };
        mutation(session);
        self.debouncer.schedule(session.clone());
        true
    }

    // ------------------------------------------------------------------
    // Activity-recording mutations: append an event and patch state in one
    // logical step.
    // ------------------------------------------------------------------

    /// Records a performed search: caches the (capped) result set, updates
    /// the query, and derives the session name from the first query while
    /// the name is still the default.
    pub async fn record_search(&self, query: &str, results: Vec<Paper>) -> bool {
        self.mutate(|session| {
            if session.name == DEFAULT_SESSION_NAME && !query.trim().is_empty() {
                session.name = derive_session_name(query);
            }
            session.state.query = query.to_string();
            let result_count = results.len();
            session.state.set_search_results(results);
            session.record_activity(
                ActivityKind::Search,
                serde_json::json!({ "query": query, "result_count": result_count }),
            );
        })
        .await
    }

    /// Records a paper moving into the selection.
    pub async fn record_paper_selected(&self, paper: Paper) -> bool {
        self.mutate(|session| {
            let data = serde_json::json!({ "paper_id": paper.paper_id, "title": paper.title });
            session.state.select_paper(paper);
            session.record_activity(ActivityKind::PaperSelected, data);
        })
        .await
    }

    /// Records a paper being excluded from the candidate set.
    pub async fn record_paper_excluded(&self, paper: Paper) -> bool {
        self.mutate(|session| {
            let data = serde_json::json!({ "paper_id": paper.paper_id, "title": paper.title });
            session.state.exclude_paper(paper);
            session.record_activity(ActivityKind::PaperExcluded, data);
        })
        .await
    }

    /// Records a paper returning to the candidate set.
    pub async fn record_paper_restored(&self, paper_id: &str) -> bool {
        self.mutate(|session| {
            session.state.restore_paper(paper_id);
            session.record_activity(
                ActivityKind::PaperRestored,
                serde_json::json!({ "paper_id": paper_id }),
            );
        })
        .await
    }

    /// Records a finished AI analysis for a paper.
    pub async fn record_analysis(&self, paper_id: &str, analysis: PaperAnalysis) -> bool {
        self.mutate(|session| {
            session.state.analyses.insert(paper_id.to_string(), analysis);
            session.record_activity(
                ActivityKind::AnalysisDone,
                serde_json::json!({ "paper_id": paper_id }),
            );
        })
        .await
    }

    /// Records a finished translation for a paper.
    pub async fn record_translation(&self, paper_id: &str, translated: String) -> bool {
        self.mutate(|session| {
            session
                .state
                .translations
                .insert(paper_id.to_string(), translated);
            session.record_activity(
                ActivityKind::TranslationDone,
                serde_json::json!({ "paper_id": paper_id }),
            );
        })
        .await
    }

    /// Appends a chat turn to the transcript.
    pub async fn record_chat_message(&self, role: MessageRole, content: &str) -> bool {
        self.mutate(|session| {
            session
                .state
                .chat_messages
                .push(ChatMessage::new(role, content));
            let kind = match role {
                MessageRole::User => ActivityKind::ChatUser,
                MessageRole::Assistant => ActivityKind::ChatAssistant,
            };
            session.record_activity(
                kind,
                serde_json::json!({ "chars": content.chars().count() }),
            );
        })
        .await
    }

    // ------------------------------------------------------------------
    // Pure state patches: no activity is logged.
    // ------------------------------------------------------------------

    /// Updates the free-text interest summary.
    pub async fn set_interest_summary(&self, summary: String) -> bool {
        self.mutate(|session| {
            session.apply_patch(SessionStatePatch {
                interest_summary: Some(summary),
                ..Default::default()
            });
        })
        .await
    }

    /// Sets or clears the cross-paper context summary.
    pub async fn set_context_summary(&self, summary: Option<String>) -> bool {
        self.mutate(|session| {
            session.apply_patch(SessionStatePatch {
                context_summary: Some(summary),
                ..Default::default()
            });
        })
        .await
    }

    /// Toggles the research-assistant panel flag.
    pub async fn set_assistant_active(&self, active: bool) -> bool {
        self.mutate(|session| {
            session.apply_patch(SessionStatePatch {
                assistant_active: Some(active),
                ..Default::default()
            });
        })
        .await
    }

    /// Updates the sort preference.
    pub async fn set_sort_mode(&self, sort_mode: SortMode) -> bool {
        self.mutate(|session| {
            session.apply_patch(SessionStatePatch {
                sort_mode: Some(sort_mode),
                ..Default::default()
            });
        })
        .await
    }

    /// Replaces the cached search-result set without recording a search.
    pub async fn set_search_results(&self, results: Vec<Paper>) -> bool {
        self.mutate(|session| {
            session.apply_patch(SessionStatePatch {
                search_results: Some(results),
                ..Default::default()
            });
        })
        .await
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Creates a new session and makes it current, subject to the
    /// [`MAX_SESSION_COUNT`] cap.
    ///
    /// On `LimitReached` nothing is persisted and the active session is
    /// untouched. On success the outgoing session's pending write (if any)
    /// is flushed before the switch.
    pub async fn create_session(&self, name: Option<&str>) -> SessionCreateOutcome {
        let current = self.index.count();
        if current >= MAX_SESSION_COUNT {
            return SessionCreateOutcome::LimitReached {
                current,
                max: MAX_SESSION_COUNT,
            };
        }

        self.debouncer.flush();

        let mut session = Session::new(name.unwrap_or(DEFAULT_SESSION_NAME));
        self.store.save_session(&mut session);
        self.index.upsert(&session);
        self.store.save_current_id(&session.id);
        *self.active.write().await = Some(session.clone());
        SessionCreateOutcome::Created(session)
    }

    /// Switches to another stored session, saving the outgoing one
    /// synchronously first — switching must never drop pending edits to the
    /// session being left.
    ///
    /// Returns `None` (leaving the active session unchanged) when the
    /// target cannot be loaded.
    pub async fn switch_session(&self, session_id: &str) -> Option<Session> {
        let mut active = self.active.write().await;
        if let Some(outgoing) = active.as_mut() {
            if outgoing.id == session_id {
                return Some(outgoing.clone());
            }
            self.debouncer.cancel();
            self.store.save_session(outgoing);
            self.index.update_entry(outgoing);
        }

        let session = self.store.load_session(session_id)?;
        self.store.save_current_id(&session.id);
        *active = Some(session.clone());
        Some(session)
    }

    /// Renames the active session, recording a `note_renamed` activity
    /// carrying the old and new names. The name lives outside the state
    /// snapshot, so this bypasses the patch path.
    pub async fn rename_session(&self, new_name: &str) -> bool {
        let mut renamed_id = None;
        let applied = self
            .mutate(|session| {
                let from = session.name.clone();
                session.record_activity(
                    ActivityKind::NoteRenamed,
                    serde_json::json!({ "from": from, "to": new_name }),
                );
                session.name = new_name.to_string();
                renamed_id = Some(session.id.clone());
            })
            .await;
        if let Some(session_id) = renamed_id {
            self.index.rename(&session_id, new_name);
        }
        applied
    }

    /// Deletes a session: directory entry first, body second, so a failure
    /// between the phases leaves an orphaned body (recoverable) rather than
    /// a dangling directory entry.
    ///
    /// When the deleted session was active, its pending write is cancelled
    /// (never flushed — a stale write must not resurrect deleted data) and
    /// a fresh session is created so the caller is never left without one.
    /// Returns the replacement session in that case.
    pub async fn delete_session(&self, session_id: &str) -> Option<Session> {
        let was_active = {
            let active = self.active.read().await;
            active.as_ref().map(|s| s.id == session_id).unwrap_or(false)
        };
        if was_active {
            self.debouncer.cancel();
        }

        self.index.remove(session_id);
        self.store.delete_session(session_id);

        if !was_active {
            return None;
        }

        *self.active.write().await = None;
        self.store.clear_current_id();
        match self.create_session(None).await {
            SessionCreateOutcome::Created(session) => Some(session),
            SessionCreateOutcome::LimitReached { .. } => None,
        }
    }

    /// Returns the session directory, lazily purging entries whose bodies
    /// are missing or unreadable.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let entries = self.index.list();
        let mut alive = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.store.load_session(&entry.id).is_some() {
                alive.push(entry);
            } else {
                debug!(session_id = %entry.id, "purging orphaned directory entry");
                self.index.remove(&entry.id);
            }
        }
        alive
    }

    /// Forces any pending debounced write to happen now. Used on teardown.
    pub fn flush(&self) {
        self.debouncer.flush();
    }

    /// Drops any pending debounced write.
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    /// Whether a debounced write is pending.
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.has_pending()
    }

    /// Replaces the in-memory active session with a copy persisted by
    /// another context. No save is scheduled; the data is already durable
    /// where it came from.
    pub async fn reconcile_external(&self, incoming: Session) {
        let mut active = self.active.write().await;
        match active.as_ref() {
            Some(current) if current.id == incoming.id => {
                debug!(session_id = %incoming.id, "reconciled session from external update");
                *active = Some(incoming);
            }
            _ => {}
        }
    }
}

fn derive_session_name(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.chars().count() <= MAX_DERIVED_NAME_CHARS {
        return trimmed.to_string();
    }
    let mut name: String = trimmed.chars().take(MAX_DERIVED_NAME_CHARS).collect();
    name.push('…');
    name
}
