//! Catalog file readers (CSV and JSON Lines)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::path::Path;

use super::IngestionError;

/// On-disk catalog format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFormat {
    /// Pick by file extension: `.jsonl`/`.ndjson` are JSON Lines, anything else CSV
    #[default]
    Auto,
    Csv,
    Jsonl,
}

impl CatalogFormat {
    fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                    Self::Jsonl
                }
                _ => Self::Csv,
            },
            other => other,
        }
    }
}

/// One parsed catalog row: field name to raw value, in source column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogRow {
    fields: Vec<(String, Value)>,
}

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Read every row of a catalog file
pub fn load_catalog(path: &Path, format: CatalogFormat) -> Result<Vec<CatalogRow>, IngestionError> {
    let rows = match format.resolve(path) {
        CatalogFormat::Jsonl => load_jsonl(path)?,
        _ => load_csv(path)?,
    };

    tracing::debug!("Read {} catalog rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn load_csv(path: &Path) -> Result<Vec<CatalogRow>, IngestionError> {
    let file = File::open(path).map_err(|e| IngestionError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestionError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestionError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut row = CatalogRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.push(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

fn load_jsonl(path: &Path) -> Result<Vec<CatalogRow>, IngestionError> {
    let content = std::fs::read_to_string(path).map_err(|e| IngestionError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|e| IngestionError::Malformed {
            path: path.to_path_buf(),
            record: line_no + 1,
            message: e.to_string(),
        })?;

        let Value::Object(object) = value else {
            return Err(IngestionError::Malformed {
                path: path.to_path_buf(),
                record: line_no + 1,
                message: "expected a JSON object".to_string(),
            });
        };

        let mut row = CatalogRow::new();
        for (name, value) in object {
            row.push(name, value);
        }
        rows.push(row);
    }

    Ok(rows)
}
