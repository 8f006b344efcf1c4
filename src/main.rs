use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use shopfind::cli::{run_command, Cli, Commands, ConfigAction};
use shopfind::config::Config;
use shopfind::corpus::{CorpusBuilder, Document};
use shopfind::embedding::{EmbeddingError, FastEmbedProvider};
use shopfind::error::{Result, ShopfindError};
use shopfind::retrieval::{FusedResult, HybridRetriever};
use tokio::io::AsyncBufReadExt;
use tracing::Instrument;

const NAME_FIELDS: [&str; 3] = ["商品名", "name", "product_name"];
const PRICE_FIELDS: [&str; 2] = ["価格", "price"];
const STOCK_FIELDS: [&str; 2] = ["stock_status", "在庫"];

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Query { query, limit, json } => {
            let config = load_config(cli.config, cli.profile, cli.catalog)?;
            run_command(runtime()?, cmd_query(config, &query, limit, json))?;
        }
        Commands::Chat => {
            let config = load_config(cli.config, cli.profile, cli.catalog)?;
            run_command(runtime()?, cmd_chat(config))?;
        }
        Commands::Stats => {
            let config = load_config(cli.config, cli.profile, cli.catalog)?;
            run_command(runtime()?, cmd_stats(config))?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, cli.catalog, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("shopfind=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopfind=info"))
    };

    // stderr keeps `query --json` output clean
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| ShopfindError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

/// Load the corpus, the embedding model and both indexes
///
/// Any failure here is fatal: no query is served from a partial build.
async fn build_retriever(config: &Config) -> Result<HybridRetriever> {
    let options = config.retrieval_options()?;

    let mut builder = CorpusBuilder::new();
    if let Some(field) = &config.catalog.id_field {
        builder = builder.with_id_field(field.clone());
    }

    let corpus = builder
        .build_from_path(&config.catalog.path, config.catalog.format)
        .inspect_err(|e| tracing::error!("Catalog ingestion failed: {}", e))?;

    let model = config.embedding.model.clone();
    let embedder = tokio::task::spawn_blocking(move || FastEmbedProvider::new(&model))
        .await
        .map_err(|e| EmbeddingError::WorkerFailed(e.to_string()))?
        .inspect_err(|e| tracing::error!("Embedding model unavailable: {}", e))?;

    let retriever = HybridRetriever::build(Arc::new(corpus), Arc::new(embedder), options)
        .await
        .inspect_err(|e| tracing::error!("Index build failed: {}", e))?;

    Ok(retriever)
}

async fn cmd_query(config: Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let retriever = build_retriever(&config).await?;
    let k = limit.unwrap_or(retriever.options().top_k);

    let result = retriever.retrieve_with_k(query, k).await;

    if json {
        let output = serde_json::to_string_pretty(&result).map_err(|e| ShopfindError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", output);
    } else {
        print_result(&result);
    }

    match result.failure {
        Some(failure) => Err(anyhow::anyhow!("Query failed: {}", failure.reason).into()),
        None => Ok(()),
    }
}

async fn cmd_chat(config: Config) -> Result<()> {
    let retriever = build_retriever(&config).await?;

    let session_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %session_id);

    chat_loop(&retriever).instrument(span).await
}

/// One retrieval per input line; a failed turn is reported and the loop goes on
async fn chat_loop(retriever: &HybridRetriever) -> Result<()> {
    tracing::info!("Chat session started");
    println!(
        "{} products loaded. Type a query, or 'exit' to quit.",
        retriever.corpus().len()
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut turns = 0usize;

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = lines.next_line().await.map_err(|e| ShopfindError::Io {
            source: e,
            context: "Failed to read from stdin".to_string(),
        })?;

        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        turns += 1;
        let result = retriever.retrieve(input).await;
        tracing::debug!(turn = turns, hits = result.len(), "Chat turn");
        print_result(&result);
    }

    tracing::info!("Chat session ended after {} turns", turns);
    Ok(())
}

async fn cmd_stats(config: Config) -> Result<()> {
    let retriever = build_retriever(&config).await?;
    let stats = retriever.stats();

    println!("Shopfind Index");
    println!("==============");
    println!("\nCatalog: {}", config.catalog.path.display());
    println!("Documents: {}", stats.documents);
    println!("\nLexical index");
    println!("  Tokenizer: {}", stats.tokenizer);
    println!("  Vocabulary: {} terms", stats.vocabulary_size);
    println!("  Average document length: {:.1} tokens", stats.average_doc_length);
    println!("\nVector index");
    println!("  Model: {}", stats.embedding_model);
    println!("  Dimension: {}", stats.vector_dimension);
    println!("\nFusion");
    println!("  top_k: {}", stats.top_k);
    println!(
        "  Weights: lexical {} / semantic {}",
        stats.lexical_weight, stats.semantic_weight
    );

    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    catalog: Option<PathBuf>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile, catalog)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| ShopfindError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = match &profile {
                Some(profile) => Config::load_with_profile(&path, profile)?,
                None => Config::load(&path)?,
            };
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Catalog: {}", config.catalog.path.display());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ShopfindError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    catalog: Option<PathBuf>,
) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = if path.exists() {
        match &profile {
            Some(profile) => Config::load_with_profile(&path, profile)?,
            None => Config::load(&path)?,
        }
    } else {
        tracing::warn!(
            "Config file not found, using defaults. Run 'shopfind config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = &profile {
            config.apply_profile(profile)?;
        }
        shopfind::config::ConfigValidator::validate(&config)?;
        config
    };

    if let Some(catalog) = catalog {
        config.catalog.path = catalog;
    }

    Ok(config)
}

fn print_result(result: &FusedResult) {
    if let Some(failure) = &result.failure {
        println!("⚠ Search is unavailable right now, please try again.");
        println!("  Reason: {}", failure.reason);
        return;
    }

    if result.is_empty() {
        println!("No matching products.");
        return;
    }

    for (i, hit) in result.documents.iter().enumerate() {
        let document = &hit.document;
        println!(
            "{}. {} (id: {}, score: {:.3})",
            i + 1,
            display_name(document),
            document.id(),
            hit.score
        );

        if let Some(price) = first_field(document, &PRICE_FIELDS) {
            println!("   Price: {}", price);
        }
        if let Some(stock) = first_field(document, &STOCK_FIELDS) {
            println!("   Stock: {}", stock);
        }
    }
}

fn first_field<'a>(document: &'a Document, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| document.field(name))
        .filter(|value| !value.is_empty())
}

fn display_name(document: &Document) -> &str {
    first_field(document, &NAME_FIELDS)
        .or_else(|| document.content().lines().next())
        .unwrap_or_else(|| document.id())
}
