//! # Finsight CLI (`finsight`)
//!
//! ```bash
//! finsight --config ./config/finsight.toml serve
//! finsight seed
//! finsight ask "How much did I spend on coffee in March?"
//! finsight chart "Monthly spending by category"
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use finsight::{config, server, service};

/// Finsight: natural-language summaries and charts over your transactions.
#[derive(Parser)]
#[command(name = "finsight", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/finsight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the store (if configured), then start the HTTP server.
    Serve,
    /// Embed and upsert the seed file into the vector store.
    Seed,
    /// Answer a question with a written summary.
    Ask {
        query: String,
    },
    /// Build chart data for a question and print it as JSON.
    Chart {
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Seed => service::run_seed(&cfg).await?,
        Commands::Ask { query } => service::run_ask(&cfg, &query).await?,
        Commands::Chart { query } => service::run_chart(&cfg, &query).await?,
    }

    Ok(())
}
