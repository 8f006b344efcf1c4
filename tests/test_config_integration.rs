//! Integration Test: Configuration files and profiles

use shopfind::config::Config;
use shopfind::corpus::CatalogFormat;
use shopfind::retrieval::RetrieverWeights;
use shopfind::text::TokenizerChoice;
use shopfind::ShopfindError;
use std::time::Duration;
use tempfile::TempDir;

const CONFIG: &str = r#"
[_meta]
schema_version = "1.0.0"

[catalog]
path = "data/商品一覧.csv"
format = "csv"
id_field = "商品ID"

[retrieval]
top_k = 3
lexical_weight = 0.4
semantic_weight = 0.6
tokenizer = "ngram:1"
query_timeout_ms = 2500
bm25_k1 = 1.2
bm25_b = 0.75

[embedding]
model = "multilingual-e5-small"
batch_size = 16
max_concurrent = 2

[profiles.exact]
lexical_weight = 1.0
semantic_weight = 0.0
tokenizer = "word"
top_k = 10
"#;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    (temp, path)
}

#[test]
fn test_load_handwritten_config() {
    let (_temp, path) = write_config(CONFIG);
    let config = Config::load(&path).unwrap();

    assert_eq!(config.catalog.format, CatalogFormat::Csv);
    assert_eq!(config.catalog.id_field.as_deref(), Some("商品ID"));

    let options = config.retrieval_options().unwrap();
    assert_eq!(options.top_k, 3);
    assert_eq!(options.weights, RetrieverWeights::new(0.4, 0.6).unwrap());
    assert_eq!(options.tokenizer, TokenizerChoice::Ngram { size: 1 });
    assert_eq!(options.query_timeout, Duration::from_millis(2500));
    assert_eq!(options.bm25.k1, 1.2);
    assert_eq!(options.batch.batch_size, 16);
    assert_eq!(options.batch.max_concurrent, 2);
}

#[test]
fn test_profile_overrides() {
    let (_temp, path) = write_config(CONFIG);
    let config = Config::load_with_profile(&path, "exact").unwrap();

    let options = config.retrieval_options().unwrap();
    assert_eq!(options.top_k, 10);
    assert_eq!(options.weights.semantic(), 0.0);
    assert_eq!(options.tokenizer, TokenizerChoice::Word);
    // Untouched settings come from the base sections
    assert_eq!(options.query_timeout, Duration::from_millis(2500));

    assert!(Config::load_with_profile(&path, "nope").is_err());
}

#[test]
fn test_invalid_file_reports_all_errors() {
    let broken = CONFIG
        .replace("top_k = 3", "top_k = 0")
        .replace("bm25_b = 0.75", "bm25_b = 2.0")
        .replace("tokenizer = \"ngram:1\"", "tokenizer = \"stemmer\"");
    let (_temp, path) = write_config(&broken);

    match Config::load(&path) {
        Err(ShopfindError::ConfigValidation { errors }) => {
            let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
            assert_eq!(
                paths,
                vec!["retrieval.top_k", "retrieval.tokenizer", "retrieval.bm25_b"]
            );
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_unparseable_file() {
    let (_temp, path) = write_config("[retrieval\ntop_k = ");
    assert!(matches!(Config::load(&path), Err(ShopfindError::Toml(_))));
}
