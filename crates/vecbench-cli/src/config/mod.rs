//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── db: DbConfig          # Token, API endpoint, database id
//! └── command
//!     ├── load: LoadArgs    # Dataset file, adapter variant, collection
//!     └── search: SearchArgs # Query vector, k, metadata filters
//! ```
//!
//! Connection settings can be given as arguments or through the
//! `ASTRA_TOKEN`, `ASTRA_API_ENDPOINT` and `ASTRA_DB_ID` variables.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vecbench_vector::{DbConfig, DocumentConfig, VectorStoreConfig};

use crate::TRACING_TARGET;
use crate::dataset::parse_filter;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "vecbench")]
#[command(about = "Load and query embeddings in a vector store")]
#[command(version)]
pub struct Cli {
    /// Backend connection parameters.
    #[clap(flatten)]
    pub db: DbConfig,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Operations of the command-line tool.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Insert a JSON dataset of embeddings.
    Load(LoadArgs),
    /// Find the nearest neighbours of a vector.
    Search(SearchArgs),
}

/// Document adapter selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Metadata merged into the top level of each document.
    #[default]
    Flat,
    /// Metadata kept under a `metadata` sub-object.
    Nested,
}

/// Adapter selection shared by every command.
#[derive(Debug, Clone, clap::Args)]
pub struct StoreArgs {
    /// Document layout of the collection.
    #[arg(long, value_enum, env = "VECBENCH_VARIANT", default_value_t = Variant::Flat)]
    pub variant: Variant,

    /// Collection settings.
    #[clap(flatten)]
    pub document: DocumentConfig,
}

impl StoreArgs {
    /// Builds the store configuration of the selected adapter.
    pub fn store_config(&self) -> VectorStoreConfig {
        match self.variant {
            Variant::Flat => VectorStoreConfig::Flat(self.document.clone()),
            Variant::Nested => VectorStoreConfig::Nested(self.document.clone()),
        }
    }
}

/// Arguments of `vecbench load`.
#[derive(Debug, Clone, clap::Args)]
pub struct LoadArgs {
    /// JSON file with `ids`, `embeddings` and optional `documents` / `metadata`.
    #[arg(long)]
    pub dataset: PathBuf,

    #[clap(flatten)]
    pub store: StoreArgs,
}

/// Arguments of `vecbench search`.
#[derive(Debug, Clone, clap::Args)]
pub struct SearchArgs {
    /// Query vector as comma separated numbers.
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    pub query: Vec<f32>,

    /// Number of neighbours to return.
    #[arg(short = 'k', long = "limit", default_value_t = 10)]
    pub k: usize,

    /// Metadata equality filter as `key=value`; may be repeated.
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, Value)>,

    #[clap(flatten)]
    pub store: StoreArgs,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs build information and configuration (no secrets).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET,
            db = ?self.db,
            command = ?self.command,
            "Configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "vecbench",
            "--astra-api-endpoint",
            "https://db.example.com",
            "search",
            "--query",
            "1.0,2.0,-3.5",
            "-k",
            "2",
            "--filter",
            "key=value",
            "--filter",
            "rank=3",
            "--variant",
            "nested",
        ])
        .unwrap();

        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query, [1.0, 2.0, -3.5]);
        assert_eq!(args.k, 2);
        assert_eq!(
            args.filters,
            [
                ("key".to_string(), json!("value")),
                ("rank".to_string(), json!(3))
            ]
        );
        assert_eq!(args.store.store_config().backend_name(), "nested");
        assert_eq!(cli.db.api_endpoint.as_deref(), Some("https://db.example.com"));
    }

    #[test]
    fn test_parse_load_defaults() {
        let cli = Cli::try_parse_from(["vecbench", "load", "--dataset", "data.json"]).unwrap();

        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert_eq!(args.dataset, PathBuf::from("data.json"));
        let config = args.store.store_config();
        assert_eq!(config.backend_name(), "flat");
        assert_eq!(config.document_config().vector_dimension, 1536);
    }
}
