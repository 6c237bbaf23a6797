//! NEAR FT Relay server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│  Ledger  │───▶│  Relay   │───▶│ Gateway  │
//! │  (YAML)  │    │(rpc/sim) │    │ (gate)   │    │ (axum)   │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Usage: `near_ft_relay [--env testnet|mainnet|sandbox|dev] [--port N]`

use std::sync::Arc;

use anyhow::Context;

use near_ft_relay::config::AppConfig;
use near_ft_relay::gateway::{self, AppState};
use near_ft_relay::ledger;
use near_ft_relay::logging::init_logging;
use near_ft_relay::relay::TransferRelay;

const GIT_HASH: &str = env!("GIT_HASH");

/// `--env`/`-e`, else `NEAR_ENV`, else testnet
fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    std::env::var("NEAR_ENV")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "testnet".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let (mut config, notices) =
        AppConfig::load(&env).with_context(|| format!("Failed to load '{}' config", env))?;
    if let Some(port) = get_port_override() {
        config.server.port = port;
    }

    let _log_guard = init_logging(&config);
    for notice in &notices {
        tracing::warn!("{}", notice);
    }

    let version = format!("{}+{}", env!("CARGO_PKG_VERSION"), GIT_HASH);
    tracing::info!("Starting NEAR FT relay {} in {} mode", version, env);
    tracing::info!(
        network = %config.near.network_id,
        master_account = %config.near.master_account,
        ft_contract = %config.near.ft_contract,
        ledger = ?config.ledger.mode,
        max_concurrency = config.relay.max_concurrency,
        skip_storage_check = config.relay.skip_storage_check,
        "Config loaded"
    );

    let ledger = ledger::connect(&config).context("Failed to initialize ledger")?;
    let relay = TransferRelay::new(ledger, config.near.ft_contract.clone(), &config.relay)
        .context("Failed to initialize relay")?;

    let state = Arc::new(AppState::new(Arc::new(relay)).with_version(version));
    gateway::run_server(&config.server.host, config.server.port, state)
        .await
        .context("Gateway server error")?;

    tracing::info!("NEAR FT relay stopped");
    Ok(())
}
