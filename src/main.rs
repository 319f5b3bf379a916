//! # Context Engine CLI
//!
//! A code-aware context engine: incremental indexing, multi-method
//! retrieval, fusion/ranking, and token-budgeted packing for AI coding
//! assistants.
//!
//! ## Quick start
//!
//! ```bash
//! ctx index --config ctx.toml
//! ctx query --config ctx.toml --text "why does login fail" --budget 4000
//! ctx serve --config ctx.toml
//! ```

mod budget;
mod chunker;
mod config;
mod db;
mod embedding;
mod engine;
mod error;
mod fusion;
mod indexer;
mod intent;
mod metadata_store;
mod migrate;
mod models;
mod packer;
mod ranker;
mod retrievers;
mod server;
mod strategy;
mod tokenizer;
mod vector_store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use engine::{Engine, QueryRequest};

#[derive(Parser)]
#[command(
    name = "ctx",
    about = "Context Engine — code-aware context retrieval for AI coding assistants",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./ctx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the index up to date with the workspace and exit
    Index,

    /// Run a single query against the index
    Query {
        /// The request text
        #[arg(long)]
        text: String,

        /// Token budget for the packed context
        #[arg(long, default_value_t = 4000)]
        budget: u32,

        /// Path of the file currently open in the editor, if any
        #[arg(long)]
        active_file: Option<String>,
    },

    /// Start the HTTP server
    Serve,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let engine = Engine::new(cfg.clone()).await?;
    engine.initialize().await?;

    match cli.command {
        Commands::Index => {
            println!("Index is up to date.");
        }
        Commands::Query {
            text,
            budget,
            active_file,
        } => {
            let mut request = QueryRequest::new(text, budget);
            request.active_file = active_file;
            let result = engine.query(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Serve => {
            server::run_server(&cfg, std::sync::Arc::new(engine)).await?;
        }
    }

    Ok(())
}
