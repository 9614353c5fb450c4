//! Relevance building blocks.
//!
//! - `vector`: pure numeric functions (cosine similarity, averaging, score
//!   remapping) and embedding-input preparation
//! - `provider`: the embedding service contract
//! - `cache`: process-wide embedding cache with fetch-on-miss

mod cache;
mod provider;
mod vector;

pub use cache::EmbeddingCache;
pub use provider::{EmbeddingProvider, MAX_EMBED_BATCH};
pub use vector::{
    MAX_EMBED_INPUT_CHARS, average_embedding, cosine_similarity, embedding_input, normalize_text,
    relevance_score,
};
