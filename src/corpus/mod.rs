//! Catalog ingestion
//!
//! Loads catalog rows, normalizes them into immutable documents, and freezes
//! the result into a `Corpus` that both indexes are built from.

mod builder;
mod document;
mod loader;

pub use builder::CorpusBuilder;
pub use document::{Corpus, Document};
pub use loader::{load_catalog, CatalogFormat, CatalogRow};

use std::path::PathBuf;
use thiserror::Error;

/// Catalog could not be turned into a usable corpus. Always fatal at startup.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Cannot read catalog {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Malformed record {record} in {path}: {message}")]
    Malformed {
        path: PathBuf,
        record: usize,
        message: String,
    },

    #[error("Catalog contains no documents")]
    EmptyCorpus,

    #[error("Row {row} has no fields")]
    EmptyRow { row: usize },

    #[error("Row {row} has no value for id field '{field}'")]
    MissingId { row: usize, field: String },

    #[error("Duplicate document id '{id}' at row {row}")]
    DuplicateId { id: String, row: usize },
}
