//! Turns catalog rows into a normalized corpus

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::{load_catalog, CatalogFormat, CatalogRow, Corpus, Document, IngestionError};
use crate::text::{normalize, normalize_display};

/// Maps catalog rows to documents
///
/// Each document's content is one `field: value` line per column in source
/// order, normalized as a whole. Metadata holds every column value
/// (normalized); the source row number is kept on the document itself.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    id_field: Option<String>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take document ids from this column instead of the row number
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn build(&self, rows: &[CatalogRow]) -> Result<Corpus, IngestionError> {
        if rows.is_empty() {
            return Err(IngestionError::EmptyCorpus);
        }

        let documents = rows
            .iter()
            .enumerate()
            .map(|(row_no, row)| self.document_from_row(row_no, row))
            .collect::<Result<Vec<_>, _>>()?;

        let corpus = Corpus::new(documents)?;
        info!("Built corpus of {} documents", corpus.len());
        Ok(corpus)
    }

    pub fn build_from_path(&self, path: &Path, format: CatalogFormat) -> Result<Corpus, IngestionError> {
        let rows = load_catalog(path, format)?;
        self.build(&rows)
    }

    fn document_from_row(&self, row_no: usize, row: &CatalogRow) -> Result<Document, IngestionError> {
        if row.is_empty() {
            return Err(IngestionError::EmptyRow { row: row_no });
        }

        let mut lines = Vec::with_capacity(row.len());
        let mut metadata = BTreeMap::new();

        for (name, value) in row.iter() {
            let value = normalize_value(value);
            lines.push(format!("{}: {}", name, value));
            metadata.insert(name.to_string(), value);
        }

        let id = match &self.id_field {
            Some(field) => {
                let id = row.get(field).map(normalize_value).unwrap_or_default();
                if id.is_empty() {
                    return Err(IngestionError::MissingId {
                        row: row_no,
                        field: field.clone(),
                    });
                }
                id
            }
            None => row_no.to_string(),
        };

        Ok(Document::new(id, normalize(&lines.join("\n")), metadata).with_row(row_no))
    }
}

/// Normalize a raw cell; non-string values go through lossy coercion
fn normalize_value(value: &Value) -> String {
    match value {
        Value::String(s) => normalize(s),
        Value::Null => String::new(),
        other => normalize_display(other),
    }
}
