//! Directory projection of a session.

use serde::{Deserialize, Serialize};

/// Lightweight projection of a [`crate::session::Session`] for directory
/// display.
///
/// Never independently authoritative: every field is regenerable from the
/// full session record, and the directory is treated as a cache of this
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier
    pub id: String,
    /// Session name
    pub name: String,
    /// Creation timestamp (RFC 3339 format)
    pub created_at: String,
    /// Last-update timestamp (RFC 3339 format)
    pub updated_at: String,
    /// Number of selected papers
    pub paper_count: usize,
    /// Number of retained activity events
    pub activity_count: usize,
    /// Most recent search query
    pub last_query: String,
}
