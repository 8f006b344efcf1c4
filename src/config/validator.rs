use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{Result, ShopfindError, ValidationError};
use crate::text::TokenizerChoice;
use std::str::FromStr;

/// Configuration validator
///
/// Collects every violation instead of stopping at the first one.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_catalog(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_embedding(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ShopfindError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_catalog(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked at load time; the file may be created later
        if config.catalog.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "catalog.path",
                "Catalog path cannot be empty",
            ));
        }

        if let Some(field) = &config.catalog.id_field {
            if field.trim().is_empty() {
                errors.push(ValidationError::new(
                    "catalog.id_field",
                    "Id field cannot be blank; omit it to use row numbers",
                ));
            }
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be at least 1",
            ));
        }

        let weights = [
            ("retrieval.lexical_weight", retrieval.lexical_weight),
            ("retrieval.semantic_weight", retrieval.semantic_weight),
        ];
        for (path, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be finite and non-negative, got {}", weight),
                ));
            }
        }
        if retrieval.lexical_weight + retrieval.semantic_weight <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval",
                "lexical_weight + semantic_weight must be positive",
            ));
        }

        if let Err(message) = TokenizerChoice::from_str(&retrieval.tokenizer) {
            errors.push(ValidationError::new("retrieval.tokenizer", message));
        }

        if retrieval.query_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "retrieval.query_timeout_ms",
                "Query timeout must be greater than 0",
            ));
        }

        if !retrieval.bm25_k1.is_finite() || retrieval.bm25_k1 < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.bm25_k1",
                format!("k1 must be non-negative, got {}", retrieval.bm25_k1),
            ));
        }

        if !(0.0..=1.0).contains(&retrieval.bm25_b) {
            errors.push(ValidationError::new(
                "retrieval.bm25_b",
                format!("b must be between 0.0 and 1.0, got {}", retrieval.bm25_b),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.max_concurrent == 0 {
            errors.push(ValidationError::new(
                "embedding.max_concurrent",
                "max_concurrent must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }
}
