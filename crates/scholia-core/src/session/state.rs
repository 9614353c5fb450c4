//! Working session state and shallow patching.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::paper::{Paper, PaperAnalysis};
use crate::session::message::ChatMessage;

/// Cap on the cached search-result set.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Sort preference for the result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortMode {
    /// Order by relevance score (default)
    #[default]
    Relevance,
    /// Order by publication year
    Year,
    /// Order by citation count
    Citations,
}

/// The working snapshot of a research session.
///
/// Invariant: `selected_papers`, `excluded_papers`, and the candidate view
/// ([`SessionState::candidate_papers`]) are pairwise disjoint by paper id.
/// The selection operations below maintain this; external writers must go
/// through them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current query string
    #[serde(default)]
    pub query: String,
    /// Sort preference for result display
    #[serde(default)]
    pub sort_mode: SortMode,
    /// Papers the user curated into the selection
    #[serde(default)]
    pub selected_papers: Vec<Paper>,
    /// Papers the user excluded from the candidate set
    #[serde(default)]
    pub excluded_papers: Vec<Paper>,
    /// Full search-result set, capped at [`MAX_SEARCH_RESULTS`]
    #[serde(default)]
    pub search_results: Vec<Paper>,
    /// Per-paper AI analyses, keyed by paper id
    #[serde(default)]
    pub analyses: HashMap<String, PaperAnalysis>,
    /// Per-paper translations, keyed by paper id
    #[serde(default)]
    pub translations: HashMap<String, String>,
    /// Free-text summary of the user's research interest
    #[serde(default)]
    pub interest_summary: String,
    /// Cross-paper context summary, once generated
    #[serde(default)]
    pub context_summary: Option<String>,
    /// Research chat transcript
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    /// Whether the research-assistant panel is active
    #[serde(default)]
    pub assistant_active: bool,
}

impl SessionState {
    /// Replaces the cached search results, enforcing the size cap.
    pub fn set_search_results(&mut self, mut results: Vec<Paper>) {
        results.truncate(MAX_SEARCH_RESULTS);
        self.search_results = results;
    }

    /// Moves a paper into the selection, removing it from the excluded set
    /// if present. Adding an already-selected paper is a no-op.
    pub fn select_paper(&mut self, paper: Paper) {
        self.excluded_papers.retain(|p| p.paper_id != paper.paper_id);
        if !self
            .selected_papers
            .iter()
            .any(|p| p.paper_id == paper.paper_id)
        {
            self.selected_papers.push(paper);
        }
    }

    /// Moves a paper into the excluded set, removing it from the selection
    /// if present.
    pub fn exclude_paper(&mut self, paper: Paper) {
        self.selected_papers.retain(|p| p.paper_id != paper.paper_id);
        if !self
            .excluded_papers
            .iter()
            .any(|p| p.paper_id == paper.paper_id)
        {
            self.excluded_papers.push(paper);
        }
    }

    /// Restores a paper to the candidate set by removing it from both the
    /// selection and the excluded set.
    pub fn restore_paper(&mut self, paper_id: &str) {
        self.selected_papers.retain(|p| p.paper_id != paper_id);
        self.excluded_papers.retain(|p| p.paper_id != paper_id);
    }

    /// The visible candidate set: search results that are neither selected
    /// nor excluded.
    pub fn candidate_papers(&self) -> Vec<&Paper> {
        self.search_results
            .iter()
            .filter(|p| {
                !self
                    .selected_papers
                    .iter()
                    .any(|s| s.paper_id == p.paper_id)
                    && !self
                        .excluded_papers
                        .iter()
                        .any(|e| e.paper_id == p.paper_id)
            })
            .collect()
    }

    /// Applies a shallow patch: each populated field of the patch replaces
    /// the corresponding field wholesale.
    pub fn apply_patch(&mut self, patch: SessionStatePatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(sort_mode) = patch.sort_mode {
            self.sort_mode = sort_mode;
        }
        if let Some(selected) = patch.selected_papers {
            self.selected_papers = selected;
        }
        if let Some(excluded) = patch.excluded_papers {
            self.excluded_papers = excluded;
        }
        if let Some(results) = patch.search_results {
            self.set_search_results(results);
        }
        if let Some(analyses) = patch.analyses {
            self.analyses = analyses;
        }
        if let Some(translations) = patch.translations {
            self.translations = translations;
        }
        if let Some(interest) = patch.interest_summary {
            self.interest_summary = interest;
        }
        if let Some(context) = patch.context_summary {
            self.context_summary = context;
        }
        if let Some(chat) = patch.chat_messages {
            self.chat_messages = chat;
        }
        if let Some(active) = patch.assistant_active {
            self.assistant_active = active;
        }
    }
}

/// An all-optional mirror of [`SessionState`] used for shallow merges.
///
/// `context_summary` is nested (`Option<Option<_>>`) so that a patch can
/// distinguish "leave unchanged" from "clear".
#[derive(Debug, Clone, Default)]
pub struct SessionStatePatch {
    pub query: Option<String>,
    pub sort_mode: Option<SortMode>,
    pub selected_papers: Option<Vec<Paper>>,
    pub excluded_papers: Option<Vec<Paper>>,
    pub search_results: Option<Vec<Paper>>,
    pub analyses: Option<HashMap<String, PaperAnalysis>>,
    pub translations: Option<HashMap<String, String>>,
    pub interest_summary: Option<String>,
    pub context_summary: Option<Option<String>>,
    pub chat_messages: Option<Vec<ChatMessage>>,
    pub assistant_active: Option<bool>,
}
