//! Nabla Tracker Binary
//!
//! Refreshes every configured router on a fixed interval and keeps the
//! results in an in-process registry.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ethers_core::types::Address;
use nabla_config::TrackerConfig;
use nabla_state::{PoolAggregate, PoolRegistry};
use nabla_tracker::{
    HermesPriceSource, OraclePriceSource, PoolTracker, PriceSource, Web3Reader,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nabla_tracker")]
#[command(about = "Keeps Nabla pool state in sync with chain")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/tracker.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = TrackerConfig::from_toml_with_env_overrides(&args.config)?;
    config.validate().context("Invalid tracker configuration")?;
    info!(
        "Configuration loaded from {}: chain {}, {} routers",
        args.config,
        config.chain_id,
        config.routers.len()
    );

    let reader = Arc::new(Web3Reader::new(&config.rpc_url, config.rpc_timeout())?);
    let node_chain_id = reader
        .chain_id()
        .await
        .context("Failed to read chain id from node")?;
    if node_chain_id != config.chain_id {
        anyhow::bail!(
            "Node is on chain {}, configuration expects {}",
            node_chain_id,
            config.chain_id
        );
    }
    let prices: Arc<dyn PriceSource> = match &config.pyth {
        Some(pyth) => Arc::new(HermesPriceSource::new(pyth)?),
        None => Arc::new(OraclePriceSource::new(
            reader.clone(),
            Address::from_str(config.oracle.trim_start_matches("0x"))
                .context("Invalid oracle address")?,
        )),
    };
    let tracker = PoolTracker::from_config(&config, reader, prices)?;

    let registry = PoolRegistry::new();
    for router in &config.routers {
        let address = Address::from_str(router.trim_start_matches("0x"))
            .with_context(|| format!("Invalid router address {}", router))?;
        registry.insert(PoolAggregate::new(address));
    }

    let mut interval = tokio::time::interval(config.refresh_interval());
    loop {
        interval.tick().await;
        run_cycle(&tracker, &registry).await;

        if args.once {
            break;
        }
    }

    for address in registry.addresses() {
        if let Some(aggregate) = registry.snapshot(&address) {
            let (dependencies, complete) = tracker.dependencies(&aggregate);
            info!(
                pool = ?address,
                block = aggregate.block_number,
                sub_pools = aggregate.pools.len(),
                dependencies = dependencies.len(),
                complete,
                "Final pool state"
            );
        }
    }

    Ok(())
}

async fn run_cycle(tracker: &PoolTracker, registry: &PoolRegistry) {
    for address in registry.addresses() {
        let Some(current) = registry.snapshot(&address) else {
            continue;
        };

        match tracker.refresh_with_mode(&current, &[]).await {
            Ok((refreshed, mode)) => {
                let block = refreshed.block_number;
                if registry.commit(refreshed) {
                    info!(pool = ?address, ?mode, block, "Pool refreshed");
                } else {
                    warn!(pool = ?address, "Pool removed during refresh");
                }
            }
            Err(e) => error!(pool = ?address, error = %e, "Pool refresh failed"),
        }
    }
}
