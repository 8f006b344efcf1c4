//! Hybrid retrieval combining lexical and semantic search

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::corpus::Corpus;
use crate::embedding::{BatchOptions, EmbeddingError, EmbeddingProvider};
use crate::index::{Bm25Params, LexicalIndex, LexicalIndexError, VectorIndex};
use crate::retrieval::{
    weighted_rank_fusion, FusedResult, FusionError, RankedList, RetrievedDocument,
    RetrieverWeights,
};
use crate::text::{normalize, Tokenizer, TokenizerChoice};

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Lexical index failed: {0}")]
    LexicalIndex(#[from] LexicalIndexError),

    #[error("Indexes disagree on corpus size: corpus {corpus}, lexical {lexical}, vector {vector}")]
    IndexMismatch {
        corpus: usize,
        lexical: usize,
        vector: usize,
    },

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("Retriever returned unknown document id: {0}")]
    UnknownDocument(String),
}

/// Retrieval settings fixed at build time
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub weights: RetrieverWeights,
    pub tokenizer: TokenizerChoice,
    pub bm25: Bm25Params,
    /// Deadline for the query-time embedding call
    pub query_timeout: Duration,
    pub batch: BatchOptions,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            weights: RetrieverWeights::default(),
            tokenizer: TokenizerChoice::default(),
            bm25: Bm25Params::default(),
            query_timeout: Duration::from_secs(10),
            batch: BatchOptions::default(),
        }
    }
}

/// Index statistics reported by `stats`
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverStats {
    pub documents: usize,
    pub vocabulary_size: usize,
    pub average_doc_length: f32,
    pub vector_dimension: usize,
    pub embedding_model: String,
    pub tokenizer: String,
    pub top_k: usize,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
}

/// Read-only retriever over one corpus snapshot
///
/// Built once, then shared (`Arc`) across any number of concurrent queries.
/// Both indexes are constructed from the same `Corpus`, so they always agree
/// on document identity and count.
pub struct HybridRetriever {
    corpus: Arc<Corpus>,
    lexical: LexicalIndex,
    vector: VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    options: RetrievalOptions,
}

impl HybridRetriever {
    /// Build both indexes; any failure here is fatal
    pub async fn build(
        corpus: Arc<Corpus>,
        embedder: Arc<dyn EmbeddingProvider>,
        options: RetrievalOptions,
    ) -> Result<Self, RetrievalError> {
        let start = Instant::now();
        info!(
            "Building retriever over {} documents (tokenizer: {})",
            corpus.len(),
            options.tokenizer
        );

        let lexical =
            LexicalIndex::build(&corpus, Tokenizer::new(options.tokenizer), options.bm25)?;
        let vector = VectorIndex::build(&corpus, embedder.clone(), options.batch).await?;

        if lexical.len() != corpus.len() || vector.len() != corpus.len() {
            return Err(RetrievalError::IndexMismatch {
                corpus: corpus.len(),
                lexical: lexical.len(),
                vector: vector.len(),
            });
        }

        info!(
            "Retriever ready in {}ms: {} terms, {}D vectors",
            start.elapsed().as_millis(),
            lexical.vocabulary_size(),
            vector.dimension()
        );

        Ok(Self {
            corpus,
            lexical,
            vector,
            embedder,
            options,
        })
    }

    /// Retrieve with the configured breadth, absorbing per-query failures
    pub async fn retrieve(&self, query: &str) -> FusedResult {
        self.retrieve_with_k(query, self.options.top_k).await
    }

    /// Like `retrieve` with a per-call breadth
    ///
    /// Never returns an error: a failed query yields a failure-flagged
    /// result carrying the reason.
    pub async fn retrieve_with_k(&self, query: &str, k: usize) -> FusedResult {
        match self.try_retrieve_with_k(query, k).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Query failed: {}", e);
                FusedResult::failed(query, e.to_string())
            }
        }
    }

    pub async fn try_retrieve(&self, query: &str) -> Result<FusedResult, RetrievalError> {
        self.try_retrieve_with_k(query, self.options.top_k).await
    }

    /// Run both sub-queries in parallel and fuse them
    ///
    /// A query that normalizes to nothing returns an empty result. A
    /// retriever with zero weight is not queried.
    pub async fn try_retrieve_with_k(
        &self,
        query: &str,
        k: usize,
    ) -> Result<FusedResult, RetrievalError> {
        let normalized = normalize(query);
        if normalized.is_empty() || k == 0 {
            return Ok(FusedResult::empty(query));
        }

        let start = Instant::now();
        let weights = self.options.weights;

        let (lexical, semantic) = tokio::join!(
            self.lexical_hits(&normalized, k, weights),
            self.semantic_hits(&normalized, k, weights)
        );
        let (lexical, semantic) = (lexical?, semantic?);

        debug!(
            "Sub-queries done: {} lexical, {} semantic hits",
            lexical.len(),
            semantic.len()
        );

        let fused = weighted_rank_fusion(&lexical, &semantic, weights, k);

        let mut documents = Vec::with_capacity(fused.len());
        for hit in fused {
            let document = self
                .corpus
                .by_id(&hit.document_id)
                .cloned()
                .ok_or_else(|| RetrievalError::UnknownDocument(hit.document_id.clone()))?;

            documents.push(RetrievedDocument {
                document,
                score: hit.score,
                lexical_rank: hit.lexical_rank,
                semantic_rank: hit.semantic_rank,
            });
        }

        debug!(
            "Retrieved {} documents in {}ms",
            documents.len(),
            start.elapsed().as_millis()
        );

        Ok(FusedResult {
            query: query.to_string(),
            documents,
            failure: None,
        })
    }

    async fn lexical_hits(
        &self,
        query: &str,
        k: usize,
        weights: RetrieverWeights,
    ) -> Result<RankedList, LexicalIndexError> {
        if weights.lexical() <= 0.0 {
            return Ok(RankedList::empty());
        }
        self.lexical.query(query, k)
    }

    async fn semantic_hits(
        &self,
        query: &str,
        k: usize,
        weights: RetrieverWeights,
    ) -> Result<RankedList, EmbeddingError> {
        if weights.semantic() <= 0.0 {
            return Ok(RankedList::empty());
        }
        self.vector
            .query(query, k, self.embedder.clone(), self.options.query_timeout)
            .await
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    pub fn lexical_index(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.vector
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    pub fn stats(&self) -> RetrieverStats {
        RetrieverStats {
            documents: self.corpus.len(),
            vocabulary_size: self.lexical.vocabulary_size(),
            average_doc_length: self.lexical.average_doc_length(),
            vector_dimension: self.vector.dimension(),
            embedding_model: self.embedder.model_name().to_string(),
            tokenizer: self.options.tokenizer.to_string(),
            top_k: self.options.top_k,
            lexical_weight: self.options.weights.lexical(),
            semantic_weight: self.options.weights.semantic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use std::collections::BTreeMap;

    /// One axis per known product word
    struct KeywordEmbedder;

    const AXES: [&str; 3] = ["lamp", "chair", "desk"];

    impl EmbeddingProvider for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(AXES
                .iter()
                .map(|axis| if text.contains(axis) { 1.0 } else { 0.0 })
                .collect())
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            AXES.len()
        }

        fn model_name(&self) -> &str {
            "keyword-axes"
        }
    }

    struct BrokenQueryEmbedder;

    impl EmbeddingProvider for BrokenQueryEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::GenerationError("provider down".to_string()))
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    fn corpus() -> Arc<Corpus> {
        let docs = ["red desk lamp", "oak chair", "standing desk", "floor lamp"]
            .iter()
            .enumerate()
            .map(|(i, text)| Document::new(format!("p{}", i), *text, BTreeMap::new()))
            .collect();
        Arc::new(Corpus::new(docs).unwrap())
    }

    async fn retriever(embedder: Arc<dyn EmbeddingProvider>, options: RetrievalOptions) -> HybridRetriever {
        HybridRetriever::build(corpus(), embedder, options).await.unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_fuses_both_signals() {
        let r = retriever(Arc::new(KeywordEmbedder), RetrievalOptions::default()).await;

        let result = r.retrieve("desk lamp").await;
        assert!(!result.is_failure());
        assert_eq!(result.ids()[0], "p0");
        assert!(result.len() <= 5);
        assert!(result.documents[0].lexical_rank.is_some());
        assert!(result.documents[0].semantic_rank.is_some());
    }

    #[tokio::test]
    async fn test_empty_query_is_empty_not_failure() {
        let r = retriever(Arc::new(KeywordEmbedder), RetrievalOptions::default()).await;

        for query in ["", "   ", "\u{3000}"] {
            let result = r.retrieve(query).await;
            assert!(result.is_empty());
            assert!(!result.is_failure());
        }
    }

    #[tokio::test]
    async fn test_breadth_override() {
        let r = retriever(Arc::new(KeywordEmbedder), RetrievalOptions::default()).await;

        assert_eq!(r.retrieve_with_k("lamp", 1).await.len(), 1);
        assert!(r.retrieve_with_k("lamp", 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_flagged() {
        let r = retriever(Arc::new(BrokenQueryEmbedder), RetrievalOptions::default()).await;

        assert!(r.try_retrieve("lamp").await.is_err());

        let result = r.retrieve("lamp").await;
        assert!(result.is_failure());
        assert!(result.is_empty());
        assert!(result.failure.unwrap().reason.contains("provider down"));
    }

    #[tokio::test]
    async fn test_zero_semantic_weight_skips_embedder() {
        let options = RetrievalOptions {
            weights: RetrieverWeights::new(1.0, 0.0).unwrap(),
            ..RetrievalOptions::default()
        };
        let r = retriever(Arc::new(BrokenQueryEmbedder), options).await;

        let result = r.retrieve("lamp").await;
        assert!(!result.is_failure());
        assert_eq!(result.ids(), vec!["p3", "p0"]);
        assert!(result.documents.iter().all(|d| d.semantic_rank.is_none()));
    }

    #[tokio::test]
    async fn test_stats() {
        let r = retriever(Arc::new(KeywordEmbedder), RetrievalOptions::default()).await;
        let stats = r.stats();

        assert_eq!(stats.documents, 4);
        assert_eq!(stats.vector_dimension, 3);
        assert_eq!(stats.embedding_model, "keyword-axes");
        assert_eq!(stats.tokenizer, "word");
        assert!(stats.vocabulary_size >= 6);
    }
}
