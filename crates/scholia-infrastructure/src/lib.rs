//! Infrastructure backends for Scholia.
//!
//! Implementations of the `scholia-core` storage and embedding contracts:
//! a shared in-memory storage hub with a cross-context change feed, a
//! directory-backed key-value store, the HTTP embedding provider, and TOML
//! configuration loading.

pub mod config;
pub mod dir_storage;
pub mod http_embedding;
pub mod memory_storage;

pub use config::{EmbeddingEndpointConfig, ScholiaConfig};
pub use dir_storage::DirStorage;
pub use http_embedding::HttpEmbeddingProvider;
pub use memory_storage::{ContextStorage, SharedMemoryStorage};
