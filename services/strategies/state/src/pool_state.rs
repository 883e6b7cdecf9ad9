//! Nabla pool aggregate
//!
//! One aggregate per router: the ordered token list, one sub-pool per token,
//! the block height the figures were observed at and the dependency flag the
//! change-detection layer reads. Quoting is pure; committing a quote is a
//! separate, explicit step.

use ethers_core::types::{Address, H256, I256};
use nabla_amm::{
    FeeBreakdown, SubPool, SubPoolMeta, SubPoolState, SwapError, SwapMath, SwapSimulator,
};
use nabla_dex::{NablaEvent, NablaEventKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::Stateful;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Unknown pool: {0:?}")]
    UnknownPool(Address),

    #[error("Unknown sub-pool: {0:?}")]
    UnknownSubPool(Address),

    #[error("Token list and sub-pools disagree: {tokens} tokens, {pools} sub-pools")]
    Inconsistent { tokens: usize, pools: usize },

    #[error("Token list and price feeds disagree: {tokens} tokens, {feeds} feed ids")]
    FeedMismatch { tokens: usize, feeds: usize },

    #[error("Invalid price feed id: {0}")]
    InvalidFeedId(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid reserves: {0}")]
    InvalidReserves(String),

    #[error("Swap rejected: {0}")]
    Swap(#[from] SwapError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolToken {
    pub address: Address,
    pub decimals: u8,
}

/// One per-asset swap pool behind the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NablaPool {
    pub address: Address,
    /// Slippage curve contract
    pub curve: Address,
    pub meta: SubPoolMeta,
    pub state: SubPoolState,
}

impl NablaPool {
    pub fn sub_pool(&self) -> SubPool {
        SubPool::new(self.meta, self.state)
    }
}

/// Post-swap state for one sub-pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubPoolUpdate {
    pub pool: Address,
    pub state: SubPoolState,
}

/// Both sides of a quoted swap, ready to commit with [`PoolAggregate::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub source: SubPoolUpdate,
    pub destination: SubPoolUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteResult {
    pub amount_out: I256,
    /// Charged in destination token units
    pub fees: FeeBreakdown,
    pub outcome: SwapOutcome,
}

/// Routing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    pub address: Address,
    pub block_number: u64,
    pub timestamp: i64,
    pub token_count: usize,
    pub dependencies_complete: bool,
    /// Last Pyth price-update payload, 0x-prefixed hex
    pub price_update_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAggregate {
    /// Router address
    pub address: Address,
    pub tokens: Vec<PoolToken>,
    /// Sub-pools in token order
    pub pools: Vec<NablaPool>,
    pub block_number: u64,
    pub timestamp: i64,
    pub dependencies_complete: bool,
    /// Pyth feed id per token, empty until a full refresh resolves them
    #[serde(default)]
    pub price_feed_ids: Vec<Option<H256>>,
    pub price_update_data: Option<Vec<u8>>,
}

impl PoolAggregate {
    /// Empty aggregate for a router that has not been refreshed yet
    pub fn new(address: Address) -> Self {
        Self {
            address,
            tokens: Vec::new(),
            pools: Vec::new(),
            block_number: 0,
            timestamp: 0,
            dependencies_complete: false,
            price_feed_ids: Vec::new(),
            price_update_data: None,
        }
    }

    /// Resolved feed id of the token at `index`
    pub fn price_feed_id(&self, index: usize) -> Option<H256> {
        self.price_feed_ids.get(index).copied().flatten()
    }

    pub fn token_index(&self, token: &Address) -> Option<usize> {
        self.tokens.iter().position(|t| t.address == *token)
    }

    pub fn token_addresses(&self) -> Vec<Address> {
        self.tokens.iter().map(|t| t.address).collect()
    }

    pub fn sub_pool_addresses(&self) -> Vec<Address> {
        self.pools.iter().map(|p| p.address).collect()
    }

    pub fn is_sub_pool(&self, address: &Address) -> bool {
        self.pools.iter().any(|p| p.address == *address)
    }

    pub fn pool_mut(&mut self, address: &Address) -> Option<&mut NablaPool> {
        self.pools.iter_mut().find(|p| p.address == *address)
    }

    /// Check the structural invariants: one sub-pool per token and no
    /// negative figures
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.tokens.len() != self.pools.len() {
            return Err(PoolError::Inconsistent {
                tokens: self.tokens.len(),
                pools: self.pools.len(),
            });
        }
        if !self.price_feed_ids.is_empty() && self.price_feed_ids.len() != self.tokens.len() {
            return Err(PoolError::FeedMismatch {
                tokens: self.tokens.len(),
                feeds: self.price_feed_ids.len(),
            });
        }
        for pool in &self.pools {
            let state = &pool.state;
            if state.reserve.is_negative()
                || state.reserve_with_slippage.is_negative()
                || state.total_liabilities.is_negative()
            {
                return Err(PoolError::InvalidReserves(format!(
                    "negative figures for sub-pool {:?}",
                    pool.address
                )));
            }
        }
        Ok(())
    }

    /// Quote `amount_in` of `token_in` (in its own decimals) into `token_out`
    pub fn quote(
        &self,
        token_in: &Address,
        token_out: &Address,
        amount_in: I256,
    ) -> Result<QuoteResult, SwapError> {
        if token_in == token_out {
            return Err(SwapError::InvalidToken);
        }
        let source_index = self.token_index(token_in).ok_or(SwapError::InvalidToken)?;
        let destination_index = self.token_index(token_out).ok_or(SwapError::InvalidToken)?;

        let source = self.pools.get(source_index).ok_or(SwapError::InvalidToken)?;
        let destination = self
            .pools
            .get(destination_index)
            .ok_or(SwapError::InvalidToken)?;

        let result = SwapMath::quote(
            &source.sub_pool(),
            &destination.sub_pool(),
            amount_in,
            self.tokens[source_index].decimals,
            self.tokens[destination_index].decimals,
        )?;

        if result.amount_out > destination.state.reserve {
            return Err(SwapError::InsufficientReserves);
        }

        Ok(QuoteResult {
            amount_out: result.amount_out,
            fees: result.fees,
            outcome: SwapOutcome {
                source: SubPoolUpdate {
                    pool: source.address,
                    state: result.source,
                },
                destination: SubPoolUpdate {
                    pool: destination.address,
                    state: result.destination,
                },
            },
        })
    }

    /// Commit a previously quoted swap
    ///
    /// Both sub-pools are checked before either is written, so an outcome
    /// from a different aggregate leaves this one untouched.
    pub fn apply(&mut self, outcome: &SwapOutcome) -> Result<(), PoolError> {
        for update in [&outcome.source, &outcome.destination] {
            if !self.is_sub_pool(&update.pool) {
                return Err(PoolError::UnknownSubPool(update.pool));
            }
        }
        for update in [&outcome.source, &outcome.destination] {
            if let Some(pool) = self.pool_mut(&update.pool) {
                pool.state = update.state;
            }
        }
        Ok(())
    }

    pub fn describe(&self) -> PoolMetadata {
        PoolMetadata {
            address: self.address,
            block_number: self.block_number,
            timestamp: self.timestamp,
            token_count: self.tokens.len(),
            dependencies_complete: self.dependencies_complete,
            price_update_data: self
                .price_update_data
                .as_ref()
                .map(|data| format!("0x{}", hex::encode(data))),
        }
    }
}

impl Stateful for PoolAggregate {
    type Event = NablaEvent;
    type Error = PoolError;

    /// Reserve and fee events overwrite the matching sub-pool. Events from
    /// other contracts and price pushes leave the aggregate unchanged.
    fn apply_event(&mut self, event: Self::Event) -> Result<(), Self::Error> {
        let pool = match self.pool_mut(&event.address) {
            Some(pool) => pool,
            None => return Ok(()),
        };

        match event.kind {
            NablaEventKind::ReserveUpdated {
                reserve,
                reserve_with_slippage,
                total_liabilities,
            } => {
                pool.state.reserve = reserve;
                pool.state.reserve_with_slippage = reserve_with_slippage;
                pool.state.total_liabilities = total_liabilities;
            }
            NablaEventKind::SwapFeesSet {
                lp_fee,
                backstop_fee,
                protocol_fee,
            } => {
                pool.meta.lp_fee = lp_fee;
                pool.meta.backstop_fee = backstop_fee;
                pool.meta.protocol_fee = protocol_fee;
            }
            NablaEventKind::PriceFeedUpdate { .. } => {}
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    fn restore(&mut self, snapshot: &[u8]) -> Result<(), Self::Error> {
        let restored: PoolAggregate = bincode::deserialize(snapshot)?;
        restored.validate()?;
        *self = restored;
        Ok(())
    }
}

impl SwapSimulator for PoolAggregate {
    type Token = Address;
    type Quote = QuoteResult;
    type Outcome = SwapOutcome;
    type Metadata = PoolMetadata;
    type Error = PoolError;

    fn quote(
        &self,
        token_in: &Address,
        token_out: &Address,
        amount_in: I256,
    ) -> Result<QuoteResult, PoolError> {
        PoolAggregate::quote(self, token_in, token_out, amount_in).map_err(PoolError::from)
    }

    fn apply(&mut self, outcome: &SwapOutcome) -> Result<(), PoolError> {
        PoolAggregate::apply(self, outcome)
    }

    fn describe(&self) -> PoolMetadata {
        PoolAggregate::describe(self)
    }

    fn tokens(&self) -> Vec<Address> {
        self.token_addresses()
    }
}
