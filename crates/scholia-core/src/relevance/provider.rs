//! Embedding service contract.

use async_trait::async_trait;

use crate::error::Result;

/// Upstream bound on the number of texts per embedding request.
pub const MAX_EMBED_BATCH: usize = 50;

/// Trait for embedding services.
///
/// Implementors turn an ordered batch of texts into a parallel ordered
/// batch of fixed-dimension vectors. The HTTP-backed implementation lives
/// in `scholia-infrastructure`; tests supply deterministic mocks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generates embeddings for a batch of texts.
    ///
    /// # Arguments
    ///
    /// * `texts` - Input texts, at most [`MAX_EMBED_BATCH`] per call
    ///
    /// # Returns
    ///
    /// One vector per input text, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScholiaError::Embedding`] if the service call fails
    /// or the response does not match the request shape.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
