/// Concurrent batch embedding for index builds and deadline-bound query embedding
use super::{EmbeddingError, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Batching settings for build-time embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Number of texts sent to the provider per call
    pub batch_size: usize,
    /// Maximum number of batches in flight
    pub max_concurrent: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            max_concurrent: 4,
        }
    }
}

/// Embed every text, returning vectors in input order
///
/// Batches run on blocking worker threads, at most `max_concurrent` at a
/// time. The first failed batch fails the whole call; there is no partial
/// result.
pub async fn embed_all(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    options: BatchOptions,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let start = Instant::now();
    let total = texts.len();

    info!("Embedding {} texts with {}", total, provider.model_name());

    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let mut handles = Vec::new();

    for chunk in texts.chunks(options.batch_size.max(1)) {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EmbeddingError::WorkerFailed(e.to_string()))?;

        let provider = provider.clone();
        let chunk = chunk.to_vec();

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let embeddings = provider.embed_batch(&chunk)?;
            if embeddings.len() != chunk.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }
            Ok(embeddings)
        }));
    }

    let mut vectors = Vec::with_capacity(total);
    for handle in handles {
        let batch = handle
            .await
            .map_err(|e| EmbeddingError::WorkerFailed(e.to_string()))??;
        debug!("Embedded batch of {} texts", batch.len());
        vectors.extend(batch);
    }

    info!(
        "Embedding complete: {} vectors in {}ms",
        vectors.len(),
        start.elapsed().as_millis()
    );

    Ok(vectors)
}

/// Embed a single text, giving up after `timeout`
///
/// A timed-out call keeps running on its worker thread but its result is
/// discarded.
pub async fn embed_with_timeout(
    provider: Arc<dyn EmbeddingProvider>,
    text: String,
    timeout: Duration,
) -> Result<Vec<f32>, EmbeddingError> {
    let task = tokio::task::spawn_blocking(move || provider.embed(&text));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(EmbeddingError::WorkerFailed(e.to_string())),
        Err(_) => Err(EmbeddingError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
