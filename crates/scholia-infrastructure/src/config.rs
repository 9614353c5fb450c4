//! Configuration loading.
//!
//! Reads `~/.config/scholia/config.toml`. A missing file yields the
//! defaults; a corrupt file is an error so misconfiguration is not
//! silently ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scholia_core::{Result, ScholiaError};

/// Embedding service endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingEndpointConfig {
    /// Batch embedding endpoint URL
    pub endpoint: String,
    /// Bearer token, if the service requires one
    pub api_key: Option<String>,
    /// Model identifier sent with each request
    pub model: String,
}

impl Default for EmbeddingEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
        }
    }
}

/// Top-level Scholia configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScholiaConfig {
    /// Whether cross-context synchronization is active. Single-context
    /// deployments and tests can switch it off without code changes.
    pub sync_enabled: bool,
    /// Quiet window before a session mutation is persisted, in milliseconds
    pub save_debounce_ms: u64,
    /// Quiet window before relevance scores are recomputed, in milliseconds
    pub relevance_debounce_ms: u64,
    /// Override for the storage directory; defaults to the platform data
    /// directory when unset
    pub storage_dir: Option<PathBuf>,
    /// Embedding service settings
    pub embedding: EmbeddingEndpointConfig,
}

impl Default for ScholiaConfig {
    fn default() -> Self {
        Self {
            sync_enabled: true,
            save_debounce_ms: 1000,
            relevance_debounce_ms: 300,
            storage_dir: None,
            embedding: EmbeddingEndpointConfig::default(),
        }
    }
}

impl ScholiaConfig {
    /// Loads the configuration from the default path
    /// (`~/.config/scholia/config.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be read or
    /// parsed; a missing file or config directory yields the defaults.
    pub fn load() -> Result<Self> {
        match dirs::config_dir() {
            Some(config_dir) => Self::load_from(config_dir.join("scholia").join("config.toml")),
            None => Ok(Self::default()),
        }
    }

    /// Loads the configuration from an explicit path, with the same
    /// missing-file semantics as [`load`](Self::load).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScholiaError::config(format!("Failed to read {:?}: {}", path, e)))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ScholiaConfig::load_from("/nonexistent/scholia/config.toml").unwrap();
        assert_eq!(config, ScholiaConfig::default());
        assert!(config.sync_enabled);
        assert_eq!(config.save_debounce_ms, 1000);
        assert_eq!(config.relevance_debounce_ms, 300);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let toml = r#"
sync_enabled = false

[embedding]
endpoint = "https://embeddings.example/v1"
model = "custom-model"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = ScholiaConfig::load_from(file.path()).unwrap();
        assert!(!config.sync_enabled);
        assert_eq!(config.save_debounce_ms, 1000);
        assert_eq!(config.embedding.endpoint, "https://embeddings.example/v1");
        assert_eq!(config.embedding.model, "custom-model");
        assert_eq!(config.embedding.api_key, None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"sync_enabled = [not valid").unwrap();
        file.flush().unwrap();

        assert!(ScholiaConfig::load_from(file.path()).is_err());
    }
}
