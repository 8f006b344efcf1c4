/// Tantivy keyword index over a corpus snapshot
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tantivy::postings::Postings;
use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST};
use tantivy::schema::{Field, Term};
use tantivy::tokenizer::{TextAnalyzer, Token, TokenStream};
use tantivy::{doc, DocSet, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError, TERMINATED};
use thiserror::Error;

use crate::corpus::Corpus;
use crate::retrieval::RankedList;
use crate::text::{normalize, Tokenizer};

/// Name the catalog analyzer is registered under
const ANALYZER: &str = "shopfind";
const CONTENT_FIELD: &str = "content";
const POSITION_FIELD: &str = "position";
const WRITER_MEMORY: usize = 50_000_000;

#[derive(Error, Debug)]
pub enum LexicalIndexError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Indexed document {0} has no corpus position")]
    MissingPosition(u32),
}

/// BM25 Okapi parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Document length normalization (0.0 disables it)
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Feeds the crate tokenizer to tantivy so documents and queries split the same way
#[derive(Clone)]
struct CatalogAnalyzer {
    tokenizer: Tokenizer,
}

impl tantivy::tokenizer::Tokenizer for CatalogAnalyzer {
    type TokenStream<'a> = CatalogTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let tokens = self
            .tokenizer
            .tokenize(text)
            .into_iter()
            .enumerate()
            .map(|(position, text)| Token {
                position,
                text,
                ..Token::default()
            })
            .collect();

        CatalogTokenStream { tokens, cursor: 0 }
    }
}

struct CatalogTokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream for CatalogTokenStream {
    fn advance(&mut self) -> bool {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.cursor - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.cursor - 1]
    }
}

/// In-RAM tantivy index with configurable BM25 scoring
///
/// Tantivy stores the postings and document frequencies. Scores are computed
/// from those with this index's `Bm25Params`, since tantivy's own scorer fixes
/// k1 and b. Immutable after `build`; queries take `&self` and can run
/// concurrently.
pub struct LexicalIndex {
    reader: IndexReader,
    content_field: Field,
    tokenizer: Tokenizer,
    params: Bm25Params,
    doc_ids: Vec<String>,
    doc_lengths: Vec<u32>,
    total_doc_length: u64,
    vocabulary_size: usize,
}

impl LexicalIndex {
    /// Index every document's content in corpus order
    pub fn build(
        corpus: &Corpus,
        tokenizer: Tokenizer,
        params: Bm25Params,
    ) -> Result<Self, LexicalIndexError> {
        let mut schema_builder = Schema::builder();
        let indexing = TextFieldIndexing::default()
            .set_tokenizer(ANALYZER)
            .set_index_option(IndexRecordOption::WithFreqs);
        let content_field = schema_builder.add_text_field(
            CONTENT_FIELD,
            TextOptions::default().set_indexing_options(indexing),
        );
        let position_field = schema_builder.add_u64_field(POSITION_FIELD, FAST);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index
            .tokenizers()
            .register(ANALYZER, TextAnalyzer::from(CatalogAnalyzer { tokenizer }));

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY)?;

        let mut doc_ids = Vec::with_capacity(corpus.len());
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut total_doc_length = 0u64;
        let mut vocabulary = AHashSet::new();

        for (position, document) in corpus.iter().enumerate() {
            writer.add_document(doc!(
                content_field => document.content(),
                position_field => position as u64,
            ))?;

            let tokens = tokenizer.tokenize(document.content());
            doc_lengths.push(tokens.len() as u32);
            total_doc_length += tokens.len() as u64;
            vocabulary.extend(tokens);
            doc_ids.push(document.id().to_string());
        }

        writer.commit()?;
        writer.wait_merging_threads()?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        tracing::debug!(
            "Lexical index built: {} documents, {} terms",
            doc_ids.len(),
            vocabulary.len()
        );

        Ok(Self {
            reader,
            content_field,
            tokenizer,
            params,
            doc_ids,
            doc_lengths,
            total_doc_length,
            vocabulary_size: vocabulary.len(),
        })
    }

    /// Score documents sharing at least one term with the query
    ///
    /// The query is normalized and tokenized exactly like documents were at
    /// build time. A term repeated in the query counts once per occurrence.
    /// Returns at most `k` hits by descending BM25 score; equal scores keep
    /// corpus order.
    pub fn query(&self, text: &str, k: usize) -> Result<RankedList, LexicalIndexError> {
        if k == 0 || self.doc_ids.is_empty() {
            return Ok(RankedList::empty());
        }

        let tokens = self.analyze(text);
        if tokens.is_empty() {
            return Ok(RankedList::empty());
        }

        // Occurrences per distinct term, first-seen order
        let mut counts: Vec<(&str, f32)> = Vec::new();
        for token in &tokens {
            match counts.iter_mut().find(|(term, _)| *term == token.as_str()) {
                Some((_, count)) => *count += 1.0,
                None => counts.push((token.as_str(), 1.0)),
            }
        }

        let searcher = self.reader.searcher();
        let n = searcher.num_docs() as f32;
        let avgdl = self.average_doc_length();
        let Bm25Params { k1, b } = self.params;

        let mut scores: AHashMap<usize, f32> = AHashMap::new();

        for (token, occurrences) in counts {
            let term = Term::from_field_text(self.content_field, token);
            let df = searcher.doc_freq(&term)? as f32;
            if df == 0.0 {
                continue;
            }
            // IDF: ln((N - df + 0.5) / (df + 0.5) + 1), always positive
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for segment_reader in searcher.segment_readers() {
                let inverted_index = segment_reader.inverted_index(self.content_field)?;
                let Some(mut postings) =
                    inverted_index.read_postings(&term, IndexRecordOption::WithFreqs)?
                else {
                    continue;
                };
                let positions = segment_reader.fast_fields().u64(POSITION_FIELD)?;

                let mut doc = postings.doc();
                while doc != TERMINATED {
                    let position = positions
                        .first(doc)
                        .map(|p| p as usize)
                        .filter(|&p| p < self.doc_lengths.len())
                        .ok_or(LexicalIndexError::MissingPosition(doc))?;

                    let tf = postings.term_freq() as f32;
                    let dl = self.doc_lengths[position] as f32;
                    let length_norm = if avgdl > 0.0 { dl / avgdl } else { 1.0 };
                    let weight = idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * length_norm));

                    *scores.entry(position).or_insert(0.0) += occurrences * weight;
                    doc = postings.advance();
                }
            }
        }

        let mut candidates: Vec<(usize, f32)> = scores.into_iter().collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates.truncate(k);

        Ok(RankedList::from_scored(
            candidates
                .into_iter()
                .map(|(position, score)| (self.doc_ids[position].as_str(), score)),
        ))
    }

    /// Tokens the index would produce for `text` at query time
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(&normalize(text))
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    pub fn average_doc_length(&self) -> f32 {
        if self.doc_ids.is_empty() {
            return 0.0;
        }
        self.total_doc_length as f32 / self.doc_ids.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use crate::text::TokenizerChoice;
    use std::collections::BTreeMap;

    fn corpus(texts: &[&str]) -> Corpus {
        let documents = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Document::new(format!("d{}", i), normalize(t), BTreeMap::new()))
            .collect();
        Corpus::new(documents).unwrap()
    }

    fn index_with(texts: &[&str], choice: TokenizerChoice, params: Bm25Params) -> LexicalIndex {
        LexicalIndex::build(&corpus(texts), Tokenizer::new(choice), params).unwrap()
    }

    fn index(texts: &[&str]) -> LexicalIndex {
        index_with(texts, TokenizerChoice::Word, Bm25Params::default())
    }

    fn ids(results: &RankedList) -> Vec<&str> {
        results.ids().collect()
    }

    #[test]
    fn test_build_statistics() {
        let idx = index(&["desk lamp", "desk fan", "kettle"]);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.vocabulary_size(), 4);
        assert!((idx.average_doc_length() - 5.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_finds_matching_docs() {
        let idx = index(&[
            "LED desk lamp",
            "ceramic kettle",
            "desk organizer",
            "floor lamp",
        ]);

        let results = idx.query("lamp", 10).unwrap();
        let ids = ids(&results);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"d0"));
        assert!(ids.contains(&"d3"));
    }

    #[test]
    fn test_query_is_normalized() {
        let idx = index(&["usb humidifier", "kettle"]);
        let results = idx.query("  ＵＳＢ  ", 10).unwrap();
        assert_eq!(ids(&results), vec!["d0"]);
    }

    #[test]
    fn test_ranking_order() {
        let idx = index(&["lamp shade", "lamp lamp lamp", "kettle"]);
        let results = idx.query("lamp", 10).unwrap();
        assert_eq!(results.hits()[0].document_id, "d1");
        assert!(results.hits()[0].score > results.hits()[1].score);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let idx = index(&["red mug", "blue mug", "green mug"]);
        let results = idx.query("mug", 10).unwrap();
        assert_eq!(ids(&results), vec!["d0", "d1", "d2"]);
    }

    #[test]
    fn test_empty_query_and_zero_k() {
        let idx = index(&["desk lamp"]);
        assert!(idx.query("", 10).unwrap().is_empty());
        assert!(idx.query("   ", 10).unwrap().is_empty());
        assert!(idx.query("lamp", 0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_terms_contribute_nothing() {
        let idx = index(&["desk lamp", "kettle"]);
        assert!(idx.query("nonexistent", 10).unwrap().is_empty());

        let mixed = idx.query("nonexistent kettle", 10).unwrap();
        assert_eq!(ids(&mixed), vec!["d1"]);
    }

    #[test]
    fn test_k_truncation() {
        let idx = index(&["mug one", "mug two", "mug three"]);
        let results = idx.query("mug", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.hits()[1].rank, 1);
        assert_eq!(ids(&results), vec!["d0", "d1"]);
    }

    #[test]
    fn test_scores_positive_and_deterministic() {
        let idx = index(&["desk lamp", "desk fan", "lamp oil", "kettle"]);
        let first = idx.query("desk lamp", 10).unwrap();
        let second = idx.query("desk lamp", 10).unwrap();

        assert_eq!(first, second);
        for hit in first.hits() {
            assert!(hit.score > 0.0);
        }
    }

    #[test]
    fn test_analyze_matches_build_tokens() {
        let idx = index(&["Desk Lamp"]);
        assert_eq!(idx.analyze("Desk Lamp"), vec!["desk", "lamp"]);
    }

    #[test]
    fn test_registered_analyzer_used_for_documents() {
        // Default tantivy tokenization would keep the whole run as one term
        let idx = index_with(
            &["卓上加湿器", "電気ケトル"],
            TokenizerChoice::Ngram { size: 1 },
            Bm25Params::default(),
        );

        assert_eq!(idx.vocabulary_size(), 10);
        assert_eq!(ids(&idx.query("加湿", 10).unwrap()), vec!["d0"]);
    }

    #[test]
    fn test_score_matches_hand_computed_bm25() {
        let idx = index(&["desk lamp", "desk fan", "kettle"]);
        let results = idx.query("lamp", 10).unwrap();
        assert_eq!(ids(&results), vec!["d0"]);

        // N = 3, df = 1, tf = 1, dl = 2, avgdl = 5/3
        let (n, df, tf, dl, avgdl) = (3.0f32, 1.0f32, 1.0f32, 2.0f32, 5.0f32 / 3.0);
        let (k1, b) = (1.5f32, 0.75f32);
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        let expected = idf * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * dl / avgdl));

        assert!((results.hits()[0].score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_term_frequency_saturates_with_k1() {
        let idx = index_with(
            &["lamp lamp shade", "desk fan"],
            TokenizerChoice::Word,
            Bm25Params { k1: 1.2, b: 0.5 },
        );
        let results = idx.query("lamp", 10).unwrap();

        // N = 2, df = 1, tf = 2, dl = 3, avgdl = 2.5
        let idf = ((2.0f32 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0).ln();
        let expected = idf * 2.0 * 2.2 / (2.0 + 1.2 * (1.0 - 0.5 + 0.5 * 3.0 / 2.5));

        assert!((results.hits()[0].score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_repeated_query_terms_count_per_occurrence() {
        let idx = index(&["desk lamp", "desk fan", "kettle"]);
        let once = idx.query("lamp", 10).unwrap();
        let twice = idx.query("lamp lamp", 10).unwrap();

        assert_eq!(ids(&twice), vec!["d0"]);
        assert!((twice.hits()[0].score - 2.0 * once.hits()[0].score).abs() < 1e-5);

        // Only the repeated term is doubled
        let desk = idx.query("desk", 10).unwrap().hits()[0].score;
        let lamp = once.hits()[0].score;
        let mixed = idx.query("desk lamp lamp", 10).unwrap();
        assert_eq!(mixed.hits()[0].document_id, "d0");
        assert!((mixed.hits()[0].score - (desk + 2.0 * lamp)).abs() < 1e-5);
    }

    #[test]
    fn test_zero_b_disables_length_normalization() {
        let texts = ["large blue ceramic mug", "mug", "kettle"];

        let flat = index_with(&texts, TokenizerChoice::Word, Bm25Params { k1: 1.5, b: 0.0 });
        let results = flat.query("mug", 10).unwrap();
        assert_eq!(ids(&results), vec!["d0", "d1"]);
        assert!((results.hits()[0].score - results.hits()[1].score).abs() < 1e-6);

        // With length normalization the short document wins
        let normalized = index(&texts);
        let results = normalized.query("mug", 10).unwrap();
        assert_eq!(ids(&results), vec!["d1", "d0"]);
        assert!(results.hits()[0].score > results.hits()[1].score);
    }
}
