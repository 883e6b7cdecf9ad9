//! # Nabla Pool State
//!
//! ## Purpose
//!
//! Simulator-facing state for one Nabla venue: the router's token list, one
//! sub-pool snapshot per token and the height those figures were read at.
//! Quotes are pure reads; a chosen swap is committed through an explicit
//! `apply` call so a router can explore several routes from cloned snapshots.
//!
//! ## Integration Points
//!
//! - **Input Sources**: the pool tracker (full and direct refreshes), decoded
//!   `ReserveUpdated` / `SwapFeesSet` events through [`Stateful`]
//! - **Output Destinations**: routing engines via [`nabla_amm::SwapSimulator`]
//! - **Persistence**: [`PoolEntity`] JSON form and `bincode` snapshots
//!
//! ## Architecture Role
//!
//! ```text
//! Pool Tracker → [PoolRegistry] → snapshot() → PoolAggregate::quote
//!                      ↑                              ↓
//!                 commit()/apply() ←──────────── SwapOutcome
//! ```

pub mod entity;
pub mod pool_registry;
pub mod pool_state;
pub mod traits;

pub use entity::{EntityToken, Extra, PoolEntity};
pub use pool_registry::PoolRegistry;
pub use pool_state::{
    NablaPool, PoolAggregate, PoolError, PoolMetadata, PoolToken, QuoteResult, SubPoolUpdate,
    SwapOutcome,
};
pub use traits::Stateful;
