//! Per-query result structures

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::corpus::Document;

/// One retriever hit: document id, raw retriever score, 0-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub document_id: String,
    pub score: f32,
    pub rank: usize,
}

/// Hits from a single retriever, best first
///
/// Scores are only comparable within one list; fusion looks at ranks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedList {
    hits: Vec<ScoredHit>,
}

impl RankedList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(id, score)` pairs already ordered best first; ranks follow
    /// iteration order.
    pub fn from_scored<I, S>(scored: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let hits = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (id, score))| ScoredHit {
                document_id: id.into(),
                score,
                rank,
            })
            .collect();
        Self { hits }
    }

    pub fn hits(&self) -> &[ScoredHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.document_id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids().any(|i| i == id)
    }
}

/// A fused document with its combined rank score
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub document: Arc<Document>,
    pub score: f64,
    /// Position in the lexical list, if it appeared there
    pub lexical_rank: Option<usize>,
    /// Position in the semantic list, if it appeared there
    pub semantic_rank: Option<usize>,
}

/// Why a query produced no usable result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub reason: String,
}

/// Final answer for one query
///
/// Either a ranked list of documents (possibly empty) or a failure with an
/// explanatory reason. Never cached.
#[derive(Debug, Clone, Serialize)]
pub struct FusedResult {
    pub query: String,
    pub documents: Vec<RetrievedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<QueryFailure>,
}

impl FusedResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            documents: Vec::new(),
            failure: None,
        }
    }

    pub fn failed(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            documents: Vec::new(),
            failure: Some(QueryFailure {
                reason: reason.into(),
            }),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.document.id()).collect()
    }
}
