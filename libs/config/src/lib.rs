//! # Nabla Tracker Configuration
//!
//! Configuration for the pool tracker service: RPC endpoint, the portal and
//! oracle contracts, the routers to track and the optional Pyth Hermes
//! price endpoint.
//!
//! ## Usage
//!
//! ```no_run
//! use nabla_config::TrackerConfig;
//!
//! let config = TrackerConfig::from_toml_with_env_overrides("nabla_tracker.toml")?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod tracker_config;

pub use tracker_config::{PythConfig, TrackerConfig};
