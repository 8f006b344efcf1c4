//! Configuration management for shopfind
//!
//! A TOML file with one section per subsystem, optional named profiles and
//! `SHOPFIND_SECTION__KEY` environment overrides. Every loaded configuration
//! is validated before use.

use crate::corpus::CatalogFormat;
use crate::embedding::BatchOptions;
use crate::error::{Result, ShopfindError};
use crate::index::Bm25Params;
use crate::retrieval::{RetrievalOptions, RetrieverWeights};
use crate::text::TokenizerChoice;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

const ENV_PREFIX: &str = "SHOPFIND_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub catalog: CatalogConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Where the product catalog comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: CatalogFormat,
    /// Column holding the product identifier; row numbers when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
}

/// Retrieval and fusion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    /// `whitespace`, `word`, `ngram` or `ngram:<size>`
    pub tokenizer: String,
    pub query_timeout_ms: u64,
    pub bm25_k1: f32,
    pub bm25_b: f32,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
    pub max_concurrent: usize,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::read(path)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Parse the file and apply environment overrides, without validating
    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShopfindError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ShopfindError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ShopfindError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self.profiles.get(profile).cloned().ok_or_else(|| {
            ShopfindError::Config(format!("Unknown profile: '{}'", profile))
        })?;

        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }
        if let Some(weight) = overrides.lexical_weight {
            self.retrieval.lexical_weight = weight;
        }
        if let Some(weight) = overrides.semantic_weight {
            self.retrieval.semantic_weight = weight;
        }
        if let Some(tokenizer) = overrides.tokenizer {
            self.retrieval.tokenizer = tokenizer;
        }

        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SHOPFIND_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(std::env::vars());
    }

    /// Apply overrides from `(name, value)` pairs; names without the
    /// `SHOPFIND_` prefix are ignored
    pub fn apply_overrides_from<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CATALOG__PATH" => self.catalog.path = PathBuf::from(value),
            "CATALOG__FORMAT" => self.catalog.format = parse_format(path, value)?,
            "CATALOG__ID_FIELD" => {
                self.catalog.id_field = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_value(path, value)?,
            "RETRIEVAL__LEXICAL_WEIGHT" => self.retrieval.lexical_weight = parse_value(path, value)?,
            "RETRIEVAL__SEMANTIC_WEIGHT" => {
                self.retrieval.semantic_weight = parse_value(path, value)?
            }
            "RETRIEVAL__TOKENIZER" => self.retrieval.tokenizer = value.to_string(),
            "RETRIEVAL__QUERY_TIMEOUT_MS" => {
                self.retrieval.query_timeout_ms = parse_value(path, value)?
            }
            "RETRIEVAL__BM25_K1" => self.retrieval.bm25_k1 = parse_value(path, value)?,
            "RETRIEVAL__BM25_B" => self.retrieval.bm25_b = parse_value(path, value)?,
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__BATCH_SIZE" => self.embedding.batch_size = parse_value(path, value)?,
            "EMBEDDING__MAX_CONCURRENT" => {
                self.embedding.max_concurrent = parse_value(path, value)?
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Typed retrieval settings for `HybridRetriever::build`
    pub fn retrieval_options(&self) -> Result<RetrievalOptions> {
        let weights =
            RetrieverWeights::new(self.retrieval.lexical_weight, self.retrieval.semantic_weight)?;

        let tokenizer = TokenizerChoice::from_str(&self.retrieval.tokenizer).map_err(|message| {
            ShopfindError::InvalidConfigValue {
                path: "retrieval.tokenizer".to_string(),
                message,
            }
        })?;

        Ok(RetrievalOptions {
            top_k: self.retrieval.top_k,
            weights,
            tokenizer,
            bm25: Bm25Params {
                k1: self.retrieval.bm25_k1,
                b: self.retrieval.bm25_b,
            },
            query_timeout: Duration::from_millis(self.retrieval.query_timeout_ms),
            batch: BatchOptions {
                batch_size: self.embedding.batch_size,
                max_concurrent: self.embedding.max_concurrent,
            },
        })
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ShopfindError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("shopfind").join("config.toml"))
    }
}

fn parse_value<T: FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ShopfindError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

fn parse_format(path: &str, value: &str) -> Result<CatalogFormat> {
    match value.trim().to_lowercase().as_str() {
        "auto" => Ok(CatalogFormat::Auto),
        "csv" => Ok(CatalogFormat::Csv),
        "jsonl" => Ok(CatalogFormat::Jsonl),
        other => Err(ShopfindError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Format must be 'auto', 'csv' or 'jsonl', got '{}'", other),
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = RetrievalOptions::default();

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            catalog: CatalogConfig {
                path: PathBuf::from("data/products.csv"),
                format: CatalogFormat::Auto,
                id_field: None,
            },
            retrieval: RetrievalConfig {
                top_k: defaults.top_k,
                lexical_weight: defaults.weights.lexical(),
                semantic_weight: defaults.weights.semantic(),
                tokenizer: defaults.tokenizer.to_string(),
                query_timeout_ms: defaults.query_timeout.as_millis() as u64,
                bm25_k1: defaults.bm25.k1,
                bm25_b: defaults.bm25.b,
            },
            embedding: EmbeddingConfig {
                model: "multilingual-e5-small".to_string(),
                batch_size: defaults.batch.batch_size,
                max_concurrent: defaults.batch.max_concurrent,
            },
            profiles: HashMap::from([
                (
                    "keyword".to_string(),
                    ProfileOverrides {
                        lexical_weight: Some(0.8),
                        semantic_weight: Some(0.2),
                        ..ProfileOverrides::default()
                    },
                ),
                (
                    "semantic".to_string(),
                    ProfileOverrides {
                        lexical_weight: Some(0.2),
                        semantic_weight: Some(0.8),
                        ..ProfileOverrides::default()
                    },
                ),
            ]),
        }
    }
}
