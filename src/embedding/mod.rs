/// Embedding gateway
///
/// The retrieval core only depends on the `EmbeddingProvider` contract:
/// text in, fixed-size vector out, failures surfaced as `EmbeddingError`.
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - Batched, bounded-concurrency embedding for index builds
/// - Deadline-bound single embedding for queries
mod batch;
mod provider;

pub use batch::{embed_all, embed_with_timeout, BatchOptions};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
