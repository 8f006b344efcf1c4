/// Exact cosine-similarity vector index over a corpus snapshot
use ndarray::{Array1, Array2};
use std::sync::Arc;
use std::time::Duration;

use crate::corpus::Corpus;
use crate::embedding::{embed_all, embed_with_timeout, BatchOptions, EmbeddingError, EmbeddingProvider};
use crate::retrieval::RankedList;
use crate::text::normalize;

/// Dense vector index
///
/// Every vector is L2-normalized on insert and stored as a row of one
/// matrix, so a query is a single matrix-vector product (cosine similarity).
/// Immutable after construction.
#[derive(Debug)]
pub struct VectorIndex {
    doc_ids: Vec<String>,
    /// One unit-length row per document, in corpus order
    matrix: Array2<f32>,
    dimension: usize,
}

impl VectorIndex {
    /// Embed every document of the corpus and index the vectors
    ///
    /// Any provider failure or malformed vector fails the whole build.
    pub async fn build(
        corpus: &Corpus,
        provider: Arc<dyn EmbeddingProvider>,
        options: BatchOptions,
    ) -> Result<Self, EmbeddingError> {
        let dimension = provider.dimension();
        let texts: Vec<String> = corpus.iter().map(|d| d.content().to_string()).collect();

        let vectors = embed_all(provider, texts, options).await?;
        if vectors.len() != corpus.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding count mismatch: expected {}, got {}",
                corpus.len(),
                vectors.len()
            )));
        }

        Self::from_vectors(corpus.ids(), vectors, dimension)
    }

    /// Index precomputed vectors; `doc_ids[i]` owns `vectors[i]`
    pub fn from_vectors(
        doc_ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "Vector dimension must be greater than 0".to_string(),
            ));
        }

        if doc_ids.len() != vectors.len() {
            return Err(EmbeddingError::InvalidInput(format!(
                "{} ids for {} vectors",
                doc_ids.len(),
                vectors.len()
            )));
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for mut vector in vectors {
            check_vector(&vector, dimension)?;
            l2_normalize(&mut vector);
            flat.extend(vector);
        }

        let matrix = Array2::from_shape_vec((doc_ids.len(), dimension), flat)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        tracing::debug!(
            "Vector index built: {} vectors, {}D",
            doc_ids.len(),
            dimension
        );

        Ok(Self {
            doc_ids,
            matrix,
            dimension,
        })
    }

    /// Top `k` documents by cosine similarity to `query`
    ///
    /// Equal similarities keep corpus order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RankedList, EmbeddingError> {
        if k == 0 {
            return Ok(RankedList::empty());
        }

        check_vector(query, self.dimension)?;

        let mut query = query.to_vec();
        l2_normalize(&mut query);
        let similarities = self.matrix.dot(&Array1::from(query));

        let mut candidates: Vec<(usize, f32)> = similarities.iter().copied().enumerate().collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(k);

        Ok(RankedList::from_scored(
            candidates
                .into_iter()
                .map(|(doc, score)| (self.doc_ids[doc].as_str(), score)),
        ))
    }

    /// Embed the normalized query text and search
    ///
    /// Empty text or `k == 0` returns an empty list without calling the
    /// provider. Provider failure or timeout is returned as an error, never
    /// as an empty list.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        provider: Arc<dyn EmbeddingProvider>,
        timeout: Duration,
    ) -> Result<RankedList, EmbeddingError> {
        let text = normalize(text);
        if k == 0 || text.is_empty() {
            return Ok(RankedList::empty());
        }

        let embedding = embed_with_timeout(provider, text, timeout).await?;
        self.search(&embedding, k)
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn check_vector(vector: &[f32], dimension: usize) -> Result<(), EmbeddingError> {
    if vector.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(EmbeddingError::GenerationError(
            "Vector contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
