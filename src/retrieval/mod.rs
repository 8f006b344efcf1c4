//! Hybrid retrieval
//!
//! Lexical (BM25) and semantic (embedding cosine) search over one corpus
//! snapshot, fused by weighted reciprocal rank into a single ranking.

mod fusion;
mod hybrid;
mod result;

pub use fusion::{weighted_rank_fusion, FusedHit, FusionError, RetrieverWeights};
pub use hybrid::{HybridRetriever, RetrievalError, RetrievalOptions, RetrieverStats};
pub use result::{FusedResult, QueryFailure, RankedList, RetrievedDocument, ScoredHit};
