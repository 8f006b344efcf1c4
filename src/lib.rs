//! Shopfind - product lookup with hybrid retrieval
//!
//! Builds a BM25 keyword index and an embedding index over one product
//! catalog snapshot and answers free-text queries with a single ranking
//! fused from both by weighted reciprocal rank.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retrieval;
pub mod text;

pub use error::{Result, ShopfindError};
