//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;

/// How long a finished command waits for blocking workers before exiting
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(
    name = "shopfind",
    version,
    about = "Product lookup over a catalog with hybrid keyword and semantic search",
    long_about = "Shopfind loads a product catalog, indexes it with a BM25 keyword index and an \
                  embedding index, and answers free-text queries with a single ranking fused \
                  from both."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/shopfind/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the config (e.g., "keyword", "semantic")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Catalog file, overriding catalog.path
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single query against the catalog
    Query {
        /// Search query text
        query: String,

        /// Maximum number of results to return (defaults to retrieval.top_k)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Interactive product lookup; type `exit` or `quit` to leave
    Chat,

    /// Show corpus and index statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Drive a command to completion on `runtime`, then shut it down
///
/// An embedding call abandoned after its deadline keeps its blocking worker
/// busy; dropping the runtime would wait for it. Workers still running after
/// `SHUTDOWN_GRACE` are left behind.
pub fn run_command<F: Future>(runtime: Runtime, command: F) -> F::Output {
    let output = runtime.block_on(command);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    output
}
