//! Tindex: Torrent Search Index Node
//!
//! Supervises a search-engine daemon and keeps the torrent index synced
//! from a relational source.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Map};
use std::path::PathBuf;
use tindex::cluster::{ClusterClient, ClusterOps};
use tindex::config::RuntimeConfig;
use tindex::node::NodeSupervisor;
use tindex::query;
use tindex::reindex::ReindexOrchestrator;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tindex")]
#[command(about = "Torrent search index node supervisor")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "tindex.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the search daemon and supervise it until Ctrl+C
    Start,

    /// Rebuild the torrent index from the relational source
    Reindex,

    /// Search the torrent index
    Search {
        /// Search query
        query: String,

        /// Number of results
        #[arg(short, long, default_value = "10")]
        size: u64,

        /// Rank with seeder-boosted relevance scoring
        #[arg(long)]
        scored: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = RuntimeConfig::load(&cli.config)?;

    match cli.command {
        Commands::Start => cmd_start(config).await,
        Commands::Reindex => cmd_reindex(config).await,
        Commands::Search {
            query,
            size,
            scored,
        } => cmd_search(config, &query, size, scored).await,
    }
}

async fn cmd_start(config: RuntimeConfig) -> Result<()> {
    let mut supervisor = NodeSupervisor::new(config);

    // Relay daemon stderr into our log; the supervisor itself only forwards.
    let mut errors = supervisor.subscribe_errors();
    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(chunk) => error!(daemon = %chunk, "daemon error output"),
                // A lag burst drops chunks but must not kill the relay.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "daemon error output lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    supervisor.start().await?;
    info!(
        node = supervisor.identity().node_name(),
        "node is ready; press Ctrl+C to shut down"
    );

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    supervisor.shutdown().await?;
    Ok(())
}

async fn cmd_reindex(config: RuntimeConfig) -> Result<()> {
    let client = ClusterClient::connect(&config.engine.host, config.engine.port).await?;
    let orchestrator = ReindexOrchestrator::new(&client, config.source.clone());
    orchestrator.setup_index().await?;
    info!("reindex started; the connector now streams rows into the index");
    Ok(())
}

async fn cmd_search(config: RuntimeConfig, query: &str, size: u64, scored: bool) -> Result<()> {
    let mut options = Map::new();
    options.insert("size".to_string(), json!(size));

    let request = if scored {
        query::full_search_request(query, options)?
    } else {
        query::search_request(query, options)?
    };

    let client = ClusterClient::connect(&config.engine.host, config.engine.port).await?;
    let response = client.search(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
