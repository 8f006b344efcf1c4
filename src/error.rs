use std::path::PathBuf;
use thiserror::Error;

use crate::corpus::IngestionError;
use crate::embedding::EmbeddingError;
use crate::retrieval::{FusionError, RetrievalError};

/// Main error type for Shopfind
#[derive(Error, Debug)]
pub enum ShopfindError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Catalog could not be turned into a corpus
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    /// Embedding provider unreachable or returned malformed vectors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Invalid fusion weights
    #[error("Fusion error: {0}")]
    Fusion(#[from] FusionError),

    /// Retrieval pipeline errors
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Shopfind operations
pub type Result<T> = std::result::Result<T, ShopfindError>;
