//! Text normalization and tokenization

mod normalize;
mod tokenizer;

pub use normalize::{normalize, normalize_display};
pub use tokenizer::{Tokenizer, TokenizerChoice};
