//! Immutable catalog documents and the corpus snapshot both indexes share

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::IngestionError;

/// One product record, normalized and frozen at ingestion time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    content: String,
    metadata: BTreeMap<String, String>,
    /// 0-based source row, kept apart from the catalog columns
    #[serde(default)]
    row: usize,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
            row: 0,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Identifier, unique within its corpus
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Normalized text body used for scoring
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    /// Row of the catalog this document came from
    pub fn row(&self) -> usize {
        self.row
    }
}

/// Ordered, non-empty collection of documents with unique ids
///
/// Built once and handed read-only to both indexes; a rebuild produces a new
/// `Corpus` rather than mutating this one.
#[derive(Debug)]
pub struct Corpus {
    documents: Vec<Arc<Document>>,
    positions: AHashMap<String, usize>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Result<Self, IngestionError> {
        if documents.is_empty() {
            return Err(IngestionError::EmptyCorpus);
        }

        let mut positions = AHashMap::with_capacity(documents.len());
        for (position, document) in documents.iter().enumerate() {
            if positions.insert(document.id.clone(), position).is_some() {
                return Err(IngestionError::DuplicateId {
                    id: document.id.clone(),
                    row: position,
                });
            }
        }

        Ok(Self {
            documents: documents.into_iter().map(Arc::new).collect(),
            positions,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Always false for a constructed corpus
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Arc<Document>> {
        self.documents.get(position)
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<Document>> {
        self.positions.get(id).and_then(|&p| self.documents.get(p))
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }
}
