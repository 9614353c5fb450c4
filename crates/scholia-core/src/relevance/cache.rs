//! Process-wide embedding cache.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::paper::Paper;
use crate::relevance::provider::{EmbeddingProvider, MAX_EMBED_BATCH};
use crate::relevance::vector::embedding_input;

/// In-memory mapping from paper id to embedding vector.
///
/// The cache is an explicit object owned by whoever composes the relevance
/// engine and shared by `Arc`, so its lifetime and test-reset behavior are
/// visible. Entries are never evicted and never persisted; embeddings are a
/// pure function of (title, abstract), so overlapping recomputation cycles
/// upserting the same id are idempotent and need no coordination.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached vector for `paper_id`, if present.
    pub fn get(&self, paper_id: &str) -> Option<Vec<f32>> {
        self.entries
            .read()
            .expect("embedding cache lock poisoned")
            .get(paper_id)
            .cloned()
    }

    /// Upserts a vector for `paper_id`; last writer wins.
    pub fn insert(&self, paper_id: &str, vector: Vec<f32>) {
        self.entries
            .write()
            .expect("embedding cache lock poisoned")
            .insert(paper_id.to_string(), vector);
    }

    /// Whether `paper_id` has a cached vector.
    pub fn contains(&self, paper_id: &str) -> bool {
        self.entries
            .read()
            .expect("embedding cache lock poisoned")
            .contains_key(paper_id)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("embedding cache lock poisoned")
            .len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Intended for test reset.
    pub fn clear(&self) {
        self.entries
            .write()
            .expect("embedding cache lock poisoned")
            .clear();
    }

    /// Ensures every paper in `papers` has a cached embedding, fetching
    /// misses from `provider` in batches of at most [`MAX_EMBED_BATCH`].
    ///
    /// The cancellation token is checked before each batch is issued and
    /// again before its results are applied; a cancelled cycle returns
    /// `Ok` without completing the fill.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; entries fetched by earlier batches
    /// remain cached.
    pub async fn resolve(
        &self,
        papers: &[Paper],
        provider: &dyn EmbeddingProvider,
        token: &CancellationToken,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        let missing: Vec<&Paper> = papers
            .iter()
            .filter(|p| seen.insert(p.paper_id.clone()) && !self.contains(&p.paper_id))
            .collect();

        for batch in missing.chunks(MAX_EMBED_BATCH) {
            if token.is_cancelled() {
                return Ok(());
            }
            let texts: Vec<String> = batch.iter().map(|p| embedding_input(p)).collect();
            let vectors = provider.embed_batch(&texts).await?;
            if token.is_cancelled() {
                return Ok(());
            }
            for (paper, vector) in batch.iter().zip(vectors) {
                self.insert(&paper.paper_id, vector);
            }
        }
        Ok(())
    }
}
