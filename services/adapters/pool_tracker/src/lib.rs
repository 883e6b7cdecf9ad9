//! # Nabla Pool Tracker
//!
//! ## Purpose
//!
//! Keeps each tracked router's [`nabla_state::PoolAggregate`] consistent with
//! chain state. Reads always go out as same-block batches through a
//! [`ContractReader`]; prices come from a [`PriceSource`].
//!
//! ## Architecture Role
//!
//! ```text
//! Portal / Router / Swap pools ──┐
//!   (web3 batch JSON-RPC)        ├─→ [PoolTracker::refresh] ─→ PoolRegistry::commit
//! Oracle or Pyth Hermes ─────────┘          ↑
//!                             decoded logs (replay)
//! ```
//!
//! ## Refresh Modes
//!
//! - **Full**: router asset set changed or a log was reverted
//! - **Replay**: logs supplied for the cycle
//! - **Direct**: no logs, figures and prices re-read in place

pub mod error;
pub mod prices;
pub mod reader;
pub mod tracker;
pub mod web3_reader;

pub use error::{ReadError, SyncError};
pub use prices::{
    HermesPriceSource, OraclePriceSource, PriceBatch, PriceRequest, PriceSource, PRICE_DECIMALS,
};
pub use reader::{BatchResponse, ContractCall, ContractReader};
pub use tracker::{PoolTracker, RefreshMode};
pub use web3_reader::Web3Reader;
