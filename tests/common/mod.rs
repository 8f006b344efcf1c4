//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use shopfind::embedding::{EmbeddingError, EmbeddingProvider};

pub const HASH_DIM: usize = 128;

/// Deterministic embedder: bag of character bigrams hashed into buckets
///
/// Texts sharing many bigrams end up with high cosine similarity, which is
/// enough to exercise the semantic path without a model download.
pub struct HashEmbedder {
    pub query_calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            query_calls: AtomicUsize::new(0),
        }
    }
}

pub fn hash_embed(text: &str) -> Vec<f32> {
    let chars: Vec<char> = text.chars().collect();
    let mut vector = vec![0.0f32; HASH_DIM];

    if chars.len() == 1 {
        vector[bucket(&chars)] += 1.0;
    }
    for pair in chars.windows(2) {
        vector[bucket(pair)] += 1.0;
    }
    vector
}

/// FNV-1a over the chars' code points
fn bucket(chars: &[char]) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for c in chars {
        for byte in (*c as u32).to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    (hash % HASH_DIM as u64) as usize
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(hash_embed(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| hash_embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        HASH_DIM
    }

    fn model_name(&self) -> &str {
        "hash-bigram"
    }
}

/// Builds normally; query embedding hangs while `stalled` is set
pub struct StallingEmbedder {
    pub stalled: AtomicBool,
    pub stall_for: Duration,
}

impl StallingEmbedder {
    pub fn new(stall_for: Duration) -> Self {
        Self {
            stalled: AtomicBool::new(false),
            stall_for,
        }
    }
}

impl EmbeddingProvider for StallingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::thread::sleep(self.stall_for);
        }
        Ok(hash_embed(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| hash_embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        HASH_DIM
    }

    fn model_name(&self) -> &str {
        "stalling"
    }
}

/// Provider that is unreachable for every call
pub struct UnreachableEmbedder;

impl EmbeddingProvider for UnreachableEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("connection refused".to_string()))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("connection refused".to_string()))
    }

    fn dimension(&self) -> usize {
        HASH_DIM
    }

    fn model_name(&self) -> &str {
        "unreachable"
    }
}

/// Claims one dimensionality, returns another
pub struct MisreportingEmbedder;

impl EmbeddingProvider for MisreportingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![1.0; 3])
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "misreporting"
    }
}

pub const PRODUCTS_CSV: &str = "\u{feff}商品ID,商品名,価格,stock_status
24,USB充電式卓上加湿器『モイストミニ』,2980,なし
31,LED Desk Lamp with USB port,4980,あり
32,Ergonomic Office Chair,15800,残りわずか
40,Stainless Steel Water Bottle,1980,あり
41,Wireless Ergonomic Mouse,3480,あり
52,ＵＳＢ Ｃ Charging Cable 2m,980,なし
";

pub fn write_catalog(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
