//! stealthdrop
//!
//! Drives the claim workflow from a terminal:
//! - `prefetch` downloads the claim keys and KZG params once per device
//! - `status` reports what the local artifact store holds
//! - `nullifier` connects a JSON-RPC wallet and derives the claim nullifier

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use stealthdrop_artifacts::{ArtifactCache, ArtifactStore, HttpFetcher, STORE_SCHEMA_VERSION};
use stealthdrop_common::hash_bytes_hex;
use stealthdrop_workflow::{JsonRpcWallet, Step, WorkflowController};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::StealthdropConfig;

#[derive(Parser)]
#[command(name = "stealthdrop", about = "Stealth airdrop claim workflow")]
struct Args {
    /// Artifact store directory (overrides STEALTHDROP_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download any missing proving artifacts.
    Prefetch,
    /// Print the resident artifacts as JSON.
    Status,
    /// Connect the public wallet and generate the claim nullifier.
    Nullifier {
        /// Wallet JSON-RPC endpoint (overrides STEALTHDROP_RPC_URL).
        #[arg(long)]
        rpc_url: Option<String>,
    },
}

#[derive(Serialize)]
struct StatusReport {
    data_dir: PathBuf,
    schema_version: u32,
    artifacts: Vec<ArtifactStatus>,
}

#[derive(Serialize)]
struct ArtifactStatus {
    name: String,
    size: usize,
    blake3: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stealthdrop=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let mut config = StealthdropConfig::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let store = ArtifactStore::open(&config.data_dir)
        .with_context(|| format!("failed to open store at {}", config.data_dir.display()))?;
    let cache = Arc::new(ArtifactCache::new(store, Arc::new(HttpFetcher::new())));

    match args.command {
        Command::Prefetch => prefetch(&config, &cache).await,
        Command::Status => status(&config, &cache),
        Command::Nullifier { rpc_url } => {
            let rpc_url = rpc_url
                .or_else(|| config.rpc_url.clone())
                .context("--rpc-url or STEALTHDROP_RPC_URL must be set")?;
            nullifier(&config, cache, rpc_url).await
        }
    }
}

async fn prefetch(config: &StealthdropConfig, cache: &ArtifactCache) -> Result<()> {
    let specs = config.artifacts();
    cache
        .prefetch(&specs)
        .await
        .context("failed to download artifacts")?;
    info!(count = specs.len(), "artifacts resident");
    Ok(())
}

fn status(config: &StealthdropConfig, cache: &ArtifactCache) -> Result<()> {
    let mut artifacts = Vec::new();
    for (name, _) in cache.store().entries()? {
        let bytes = cache.require(&name)?;
        artifacts.push(ArtifactStatus {
            size: bytes.len(),
            blake3: hash_bytes_hex(&bytes),
            name,
        });
    }

    let report = StatusReport {
        data_dir: config.data_dir.clone(),
        schema_version: STORE_SCHEMA_VERSION,
        artifacts,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn nullifier(
    config: &StealthdropConfig,
    cache: Arc<ArtifactCache>,
    rpc_url: String,
) -> Result<()> {
    info!("Wallet RPC: {}", rpc_url);
    let wallet = Arc::new(JsonRpcWallet::new(rpc_url));
    let controller = WorkflowController::new(wallet, cache, config.workflow());

    for step in [Step::ConnectPublicWallet, Step::GenerateNullifier] {
        controller
            .trigger(step, CancellationToken::new())
            .await
            .with_context(|| format!("step {step} failed"))?;
    }

    let state = controller.state().await;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
