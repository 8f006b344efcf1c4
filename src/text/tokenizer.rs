//! Term segmentation for the lexical index
//!
//! The same `Tokenizer` value is used to segment documents at build time and
//! queries at search time. Tokenizers do not normalize; callers pass text that
//! has already gone through [`crate::text::normalize`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

/// Which segmentation the lexical index uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenizerChoice {
    /// Split on Unicode whitespace
    Whitespace,
    /// Unicode word boundaries (UAX #29), punctuation dropped
    Word,
    /// Overlapping character n-grams of each whitespace-separated chunk
    Ngram { size: usize },
}

impl Default for TokenizerChoice {
    fn default() -> Self {
        Self::Word
    }
}

impl fmt::Display for TokenizerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whitespace => write!(f, "whitespace"),
            Self::Word => write!(f, "word"),
            Self::Ngram { size } => write!(f, "ngram:{}", size),
        }
    }
}

impl FromStr for TokenizerChoice {
    type Err = String;

    /// Parses `whitespace`, `word`, `ngram` (bigram) or `ngram:<size>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "whitespace" => Ok(Self::Whitespace),
            "word" => Ok(Self::Word),
            "ngram" => Ok(Self::Ngram { size: 2 }),
            other => {
                let size = other
                    .strip_prefix("ngram:")
                    .ok_or_else(|| format!("Unknown tokenizer '{}'", other))?;
                let size: usize = size
                    .parse()
                    .map_err(|_| format!("Invalid n-gram size '{}'", size))?;
                if size == 0 {
                    return Err("N-gram size must be at least 1".to_string());
                }
                Ok(Self::Ngram { size })
            }
        }
    }
}

/// Segments normalized text into index terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tokenizer {
    choice: TokenizerChoice,
}

impl Tokenizer {
    pub fn new(choice: TokenizerChoice) -> Self {
        let choice = match choice {
            TokenizerChoice::Ngram { size } => TokenizerChoice::Ngram { size: size.max(1) },
            other => other,
        };
        Self { choice }
    }

    pub fn choice(&self) -> TokenizerChoice {
        self.choice
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self.choice {
            TokenizerChoice::Whitespace => text.split_whitespace().map(str::to_string).collect(),
            TokenizerChoice::Word => text.unicode_words().map(str::to_string).collect(),
            TokenizerChoice::Ngram { size } => {
                let mut tokens = Vec::new();
                for chunk in text.split_whitespace() {
                    let chars: Vec<char> = chunk.chars().collect();
                    if chars.len() <= size {
                        tokens.push(chunk.to_string());
                        continue;
                    }
                    tokens.extend(chars.windows(size).map(|w| w.iter().collect::<String>()));
                }
                tokens
            }
        }
    }
}
