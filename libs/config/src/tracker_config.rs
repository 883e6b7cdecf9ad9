//! Pool tracker configuration
//!
//! Loaded from TOML with environment variable overrides. String values that
//! carry secrets (RPC and Hermes URLs) may reference environment variables as
//! `${NAME}`; they are expanded on load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Pyth Hermes endpoint used instead of the on-chain oracle for prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythConfig {
    /// Latest price update endpoint
    pub url: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// Pyth adapter contract resolving each asset's feed id on a full refresh
    pub adapter: Option<String>,

    /// Asset address to Pyth feed id, taking precedence over the adapter
    pub feeds: BTreeMap<String, String>,
}

impl Default for PythConfig {
    fn default() -> Self {
        Self {
            url: "https://hermes.pyth.network/v2/updates/price/latest".to_string(),
            timeout_ms: 5000,
            adapter: None,
            feeds: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Chain the contracts live on, checked against the node at startup
    pub chain_id: u64,

    /// Portal contract resolving router assets
    pub portal: String,

    /// Price oracle contract
    pub oracle: String,

    /// Routers to track, one pool aggregate each
    pub routers: Vec<String>,

    /// Delay between refresh cycles in milliseconds
    pub refresh_interval_ms: u64,

    /// Upper bound on a single batched read in milliseconds
    pub rpc_timeout_ms: u64,

    /// Keep cached prices instead of fetching new ones
    pub skip_price_update: bool,

    /// Fetch prices from Pyth Hermes rather than the oracle contract
    pub pyth: Option<PythConfig>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 42161,
            portal: String::new(),
            oracle: String::new(),
            routers: vec![],
            refresh_interval_ms: 5000,
            rpc_timeout_ms: 10000,
            skip_price_update: false,
            pyth: None,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(file_path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file: {}", file_path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", file_path))
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.expand_env_vars()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// A missing file falls back to defaults so a deployment can be driven
    /// entirely by the environment.
    pub fn from_toml_with_env_overrides(file_path: &str) -> Result<Self> {
        let mut config = if Path::new(file_path).exists() {
            Self::from_toml_file(file_path)?
        } else {
            debug!("Config file {} not found, using defaults", file_path);
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        use std::env;

        if let Ok(url) = env::var("NABLA_RPC_URL") {
            self.rpc_url = url;
        }

        if let Ok(chain_id) = env::var("NABLA_CHAIN_ID") {
            if let Ok(chain_id) = chain_id.parse() {
                self.chain_id = chain_id;
            }
        }

        if let Ok(adapter) = env::var("NABLA_PYTH_ADAPTER") {
            if let Some(pyth) = self.pyth.as_mut() {
                pyth.adapter = Some(adapter);
            }
        }

        if let Ok(portal) = env::var("NABLA_PORTAL") {
            self.portal = portal;
        }

        if let Ok(oracle) = env::var("NABLA_ORACLE") {
            self.oracle = oracle;
        }

        if let Ok(routers) = env::var("NABLA_ROUTERS") {
            self.routers = routers
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(interval) = env::var("NABLA_REFRESH_INTERVAL_MS") {
            if let Ok(interval) = interval.parse() {
                self.refresh_interval_ms = interval;
            }
        }

        if let Ok(skip) = env::var("NABLA_SKIP_PRICE_UPDATE") {
            if let Ok(skip) = skip.parse() {
                self.skip_price_update = skip;
            }
        }
    }

    /// Expand `${VAR}` references in endpoint URLs
    pub fn expand_env_vars(&mut self) -> Result<()> {
        self.rpc_url = shellexpand::env(&self.rpc_url)
            .context("Failed to expand RPC URL")?
            .to_string();

        if let Some(pyth) = self.pyth.as_mut() {
            pyth.url = shellexpand::env(&pyth.url)
                .context("Failed to expand Pyth URL")?
                .to_string();
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(anyhow::anyhow!("RPC URL must start with http:// or https://"));
        }

        if self.chain_id == 0 {
            return Err(anyhow::anyhow!("Chain id must be greater than 0"));
        }

        validate_address("portal", &self.portal)?;
        validate_address("oracle", &self.oracle)?;

        if self.routers.is_empty() {
            return Err(anyhow::anyhow!("At least one router must be configured"));
        }
        for router in &self.routers {
            validate_address("router", router)?;
        }

        if self.refresh_interval_ms == 0 {
            return Err(anyhow::anyhow!("Refresh interval must be greater than 0"));
        }

        if self.rpc_timeout_ms == 0 {
            return Err(anyhow::anyhow!("RPC timeout must be greater than 0"));
        }

        if let Some(pyth) = &self.pyth {
            if pyth.url.is_empty() {
                return Err(anyhow::anyhow!("Pyth URL cannot be empty"));
            }
            if let Some(adapter) = &pyth.adapter {
                validate_address("pyth adapter", adapter)?;
            }
            for (asset, feed) in &pyth.feeds {
                validate_address("pyth feed asset", asset)?;
                let digits = feed.strip_prefix("0x").unwrap_or(feed);
                if digits.len() != 64 || hex::decode(digits).is_err() {
                    return Err(anyhow::anyhow!("Invalid Pyth feed id for {}: {}", asset, feed));
                }
            }
        }

        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

fn validate_address(field: &str, value: &str) -> Result<()> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| anyhow::anyhow!("{} address must be 0x-prefixed: {:?}", field, value))?;
    if digits.len() != 40 || hex::decode(digits).is_err() {
        return Err(anyhow::anyhow!("Invalid {} address: {}", field, value));
    }
    Ok(())
}
