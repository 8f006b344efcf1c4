//! Lexical and semantic indexes
//!
//! Both are built once from the same `Corpus` snapshot and are read-only
//! afterwards, so concurrent queries need no locking.

mod keyword_index;
mod vector_index;

pub use keyword_index::{Bm25Params, LexicalIndex, LexicalIndexError};
pub use vector_index::VectorIndex;
