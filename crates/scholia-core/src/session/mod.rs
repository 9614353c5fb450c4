//! Session domain module.
//!
//! This module contains all session-related domain models: the durable
//! [`Session`] record, its working [`SessionState`] snapshot, the bounded
//! activity log, chat message types, and the lightweight
//! [`SessionSummary`] projection used by the session directory.
//!
//! # Module Structure
//!
//! - `model`: the durable session record (`Session`)
//! - `state`: working snapshot and shallow patch (`SessionState`,
//!   `SessionStatePatch`, `SortMode`)
//! - `activity`: bounded activity log (`ActivityEvent`, `ActivityKind`)
//! - `message`: chat transcript types (`MessageRole`, `ChatMessage`)
//! - `summary`: directory projection (`SessionSummary`)

mod activity;
mod message;
mod model;
mod state;
mod summary;

// Re-export public API
pub use activity::{ActivityEvent, ActivityKind, MAX_ACTIVITY_COUNT};
pub use message::{ChatMessage, MessageRole};
pub use model::{DEFAULT_SESSION_NAME, SESSION_SCHEMA_VERSION, Session};
pub use state::{MAX_SEARCH_RESULTS, SessionState, SessionStatePatch, SortMode};
pub use summary::SessionSummary;
