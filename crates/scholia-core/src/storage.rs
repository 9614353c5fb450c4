//! Storage abstraction traits.
//!
//! Session persistence is written against a synchronous string key-value
//! contract plus a change feed that delivers writes made by *other*
//! execution contexts sharing the same storage. Backends live in
//! `scholia-infrastructure`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a storage backend can report.
///
/// These are expected failure modes: the layers built on top of
/// [`KeyValueStorage`] never propagate them as `Err` across their public
/// API. Reads degrade to `None`/empty values and writes report through a
/// [`StorageErrorSink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend refused the write because its quota is exhausted.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A stored payload could not be parsed.
    #[error("malformed payload: {0}")]
    Parse(String),

    /// Any other backend failure.
    #[error("storage failure: {0}")]
    Unknown(String),
}

impl StorageError {
    /// Machine-checkable error code for callers that branch on category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Parse(_) => "parse_error",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Callback invoked when a storage operation fails in a degraded-but-handled
/// way (quota exhaustion, corrupt payload). The caller's control flow is
/// never blocked on these.
pub type StorageErrorSink = Arc<dyn Fn(&StorageError) + Send + Sync>;

/// Synchronous string key-value storage.
///
/// Mirrors the contract of a browser-origin local store: `get`/`remove`
/// never fail, `set` may fail on quota exhaustion. Values are opaque
/// strings; the layers above decide the serialization format.
pub trait KeyValueStorage: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any prior value
    /// unconditionally (last write wins).
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Idempotent; removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// A single externally-originated storage mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// The key that changed.
    pub key: String,
    /// The new value, or `None` if the key was removed.
    pub new_value: Option<String>,
}

/// Subscription interface for storage mutations performed by other contexts
/// sharing the same backend.
///
/// Implementations must never deliver a change made through the subscribing
/// context itself; only external writers are observed.
pub trait ChangeFeed: Send + Sync {
    /// Opens a new subscription. Each receiver observes every external
    /// change from the moment of subscription onward.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<StorageChange>;
}
