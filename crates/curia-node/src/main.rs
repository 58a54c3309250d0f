use anyhow::Result;
use clap::Parser;
use curia_indexer::{HttpRpcClient, Indexer};
use curia_node::{build_store, logging, CuriaConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// On-chain sync worker: reconciles stake and treasury vault events into the
/// marketplace ledger.
#[derive(Parser, Debug)]
#[command(name = "curia-worker", version)]
struct Args {
    /// Path to a curia.toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single sync iteration and exit.
    #[arg(long)]
    once: bool,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = match &args.config {
        Some(path) => CuriaConfig::from_file(path)?,
        None => CuriaConfig::default(),
    };

    if !config.indexer.enabled {
        info!("On-chain sync disabled in config, nothing to do");
        return Ok(());
    }
    if config.indexer.rpc_url.is_empty() {
        error!("indexer.rpc_url is not configured");
        std::process::exit(2);
    }

    let store = build_store(&config)?;
    let client = Arc::new(HttpRpcClient::new(config.indexer.rpc_url.clone()));
    let indexer = Indexer::new(store, client, config.indexer_config());

    if args.once {
        let report = indexer.sync_once().await?;
        info!(
            chain_id = report.chain_id,
            latest = report.latest,
            safe_latest = report.safe_latest,
            "Sync iteration complete"
        );
        return Ok(());
    }

    info!("On-chain sync worker started");
    tokio::select! {
        _ = indexer.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
