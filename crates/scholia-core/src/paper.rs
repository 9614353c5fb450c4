//! Paper domain models.
//!
//! Papers are produced by the external search service and consumed by the
//! session and relevance layers; this crate never mutates their metadata.

use serde::{Deserialize, Serialize};

/// Metadata for a single research paper.
///
/// The `paper_id` is the unique key used throughout the system: selection
/// bookkeeping, analyses, translations, and the embedding cache are all
/// keyed by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Unique identifier assigned by the search provider
    pub paper_id: String,
    /// Paper title
    pub title: String,
    /// Abstract text, when the provider supplies one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Year of publication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Author names
    #[serde(default)]
    pub authors: Vec<String>,
    /// Citation count reported by the provider
    #[serde(default)]
    pub citation_count: u32,
    /// Landing page URL
    pub url: String,
    /// Direct PDF link, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// URL slug used by the reader view, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Figure snapshot URLs, when the provider supplies them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<String>,
}

/// Stored result of an AI analysis of a single paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperAnalysis {
    /// Generated summary text
    pub summary: String,
    /// Extracted keywords, when the analysis produced any
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[cfg(test)]
pub(crate) fn test_paper(id: &str, title: &str) -> Paper {
    Paper {
        paper_id: id.to_string(),
        title: title.to_string(),
        abstract_text: Some(format!("Abstract for {}", title)),
        year: Some(2021),
        authors: vec!["A. Author".to_string()],
        citation_count: 3,
        url: format!("https://papers.example/{}", id),
        pdf_url: None,
        slug: None,
        snapshots: Vec::new(),
    }
}
