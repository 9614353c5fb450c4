//! Orchestration layer for Scholia.
//!
//! Composes the `scholia-core` domain with the `scholia-infrastructure`
//! backends: session persistence and lifecycle under a fixed quota,
//! cross-context reconciliation, and debounced relevance scoring.

pub mod bootstrap;
pub mod index;
pub mod manager;
pub mod relevance;
pub mod store;
pub mod sync;

pub use bootstrap::{ScholiaRuntime, bootstrap, bootstrap_with_storage};
pub use index::{MAX_SESSION_COUNT, SessionIndex};
pub use manager::{SessionCreateOutcome, SessionManager};
pub use relevance::{MAX_SCORED_CANDIDATES, RelevanceEngine, ScoreMap};
pub use store::{SESSION_LIST_KEY, SessionStore, session_key};
pub use sync::{ListChangedCallback, SyncService};
