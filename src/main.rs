//! Model gateway daemon
//!
//! Usage:
//!   model-gatewayd --config gateway.yaml [--bind 0.0.0.0:8069]
//!
//! Runs the gateway over the in-memory collaborators seeded from the
//! configuration file.

use anyhow::{Context, Result};
use clap::Parser;
use gateway::config::GatewayConfig;
use gateway::server::GatewayBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "gateway=info,model_gatewayd=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "model-gatewayd")]
#[command(about = "Configuration-driven REST gateway over generic record models")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Address to listen on (overrides server.bind)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let mut config = GatewayConfig::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
        config.validate().context("invalid --bind address")?;
    }

    tracing::info!(
        config = %args.config.display(),
        bind = %config.server.bind,
        "model gateway starting"
    );

    GatewayBuilder::in_memory(&config)?
        .serve(&config.server.bind)
        .await
}
