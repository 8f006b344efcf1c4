//! Weighted rank fusion for combining lexical and semantic results

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RankedList;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error(
        "Invalid retriever weights ({lexical}, {semantic}): weights must be finite, \
         non-negative and sum to a positive value"
    )]
    InvalidWeights { lexical: f32, semantic: f32 },
}

/// Trust placed in each retriever during fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrieverWeights {
    lexical: f32,
    semantic: f32,
}

impl RetrieverWeights {
    pub fn new(lexical: f32, semantic: f32) -> Result<Self, FusionError> {
        let valid = |w: f32| w.is_finite() && w >= 0.0;
        if !valid(lexical) || !valid(semantic) || lexical + semantic <= 0.0 {
            return Err(FusionError::InvalidWeights { lexical, semantic });
        }
        Ok(Self { lexical, semantic })
    }

    pub fn lexical(&self) -> f32 {
        self.lexical
    }

    pub fn semantic(&self) -> f32 {
        self.semantic
    }
}

impl Default for RetrieverWeights {
    fn default() -> Self {
        Self {
            lexical: 0.5,
            semantic: 0.5,
        }
    }
}

/// One document of the fused ranking
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub document_id: String,
    pub score: f64,
    pub lexical_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
}

impl FusedHit {
    pub fn in_both(&self) -> bool {
        self.lexical_rank.is_some() && self.semantic_rank.is_some()
    }
}

/// Fuse two ranked lists by position
///
/// Each hit contributes `weight / (rank + 1)` with a 0-based rank; a document
/// present in both lists sums its contributions. The union is ordered by
/// combined score, then presence in both lists, then lexical position, then
/// semantic position, and truncated to `k`. A list whose weight is zero is
/// ignored entirely. The output depends only on the inputs.
pub fn weighted_rank_fusion(
    lexical: &RankedList,
    semantic: &RankedList,
    weights: RetrieverWeights,
    k: usize,
) -> Vec<FusedHit> {
    if k == 0 {
        return Vec::new();
    }

    let mut fused: Vec<FusedHit> = Vec::with_capacity(lexical.len() + semantic.len());
    let mut slots: AHashMap<&str, usize> = AHashMap::new();

    if weights.lexical > 0.0 {
        for (rank, id) in lexical.ids().enumerate() {
            if slots.contains_key(id) {
                continue;
            }
            slots.insert(id, fused.len());
            fused.push(FusedHit {
                document_id: id.to_string(),
                score: rank_score(weights.lexical, rank),
                lexical_rank: Some(rank),
                semantic_rank: None,
            });
        }
    }

    if weights.semantic > 0.0 {
        for (rank, id) in semantic.ids().enumerate() {
            match slots.get(id) {
                Some(&slot) => {
                    let hit = &mut fused[slot];
                    if hit.semantic_rank.is_none() {
                        hit.score += rank_score(weights.semantic, rank);
                        hit.semantic_rank = Some(rank);
                    }
                }
                None => {
                    slots.insert(id, fused.len());
                    fused.push(FusedHit {
                        document_id: id.to_string(),
                        score: rank_score(weights.semantic, rank),
                        lexical_rank: None,
                        semantic_rank: Some(rank),
                    });
                }
            }
        }
    }

    fused.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.in_both().cmp(&a.in_both()))
            .then_with(|| position(a.lexical_rank).cmp(&position(b.lexical_rank)))
            .then_with(|| position(a.semantic_rank).cmp(&position(b.semantic_rank)))
    });
    fused.truncate(k);
    fused
}

fn rank_score(weight: f32, rank: usize) -> f64 {
    weight as f64 / (rank as f64 + 1.0)
}

/// Absent ranks sort after every present one
fn position(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}
