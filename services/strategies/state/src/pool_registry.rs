//! Concurrent registry of tracked venues
//!
//! Each venue lives behind its own lock. Readers take a cloned snapshot and
//! quote against it without holding the lock; writers either commit a whole
//! refreshed aggregate or apply a single swap outcome.

use std::sync::Arc;

use dashmap::DashMap;
use ethers_core::types::Address;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::pool_state::{PoolAggregate, PoolError, SwapOutcome};

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: DashMap<Address, Arc<RwLock<PoolAggregate>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a venue; an existing entry for the same address is replaced
    pub fn insert(&self, aggregate: PoolAggregate) {
        let address = aggregate.address;
        let replaced = self
            .pools
            .insert(address, Arc::new(RwLock::new(aggregate)))
            .is_some();
        info!(pool = ?address, replaced, "Registered Nabla pool");
    }

    pub fn get(&self, address: &Address) -> Option<Arc<RwLock<PoolAggregate>>> {
        self.pools.get(address).map(|entry| Arc::clone(entry.value()))
    }

    /// Independent copy for lock-free quoting
    pub fn snapshot(&self, address: &Address) -> Option<PoolAggregate> {
        self.get(address).map(|pool| pool.read().clone())
    }

    /// Swap in a refreshed aggregate. Returns false if the venue is not tracked.
    pub fn commit(&self, aggregate: PoolAggregate) -> bool {
        match self.get(&aggregate.address) {
            Some(pool) => {
                debug!(
                    pool = ?aggregate.address,
                    block = aggregate.block_number,
                    "Committed refreshed pool state"
                );
                *pool.write() = aggregate;
                true
            }
            None => false,
        }
    }

    /// Commit a quoted swap under the venue's write lock
    pub fn apply(&self, address: &Address, outcome: &SwapOutcome) -> Result<(), PoolError> {
        let pool = self.get(address).ok_or(PoolError::UnknownPool(*address))?;
        let mut guard = pool.write();
        guard.apply(outcome)
    }

    pub fn remove(&self, address: &Address) -> Option<PoolAggregate> {
        let (_, pool) = self.pools.remove(address)?;
        info!(pool = ?address, "Removed Nabla pool");
        let aggregate = pool.read().clone();
        Some(aggregate)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.pools.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_state::SubPoolUpdate;
    use ethers_core::types::I256;
    use nabla_amm::SubPoolState;

    fn empty_update() -> SubPoolUpdate {
        SubPoolUpdate {
            pool: Address::zero(),
            state: SubPoolState {
                reserve: I256::zero(),
                reserve_with_slippage: I256::zero(),
                total_liabilities: I256::zero(),
                price: None,
            },
        }
    }

    #[test]
    fn test_insert_snapshot_remove() {
        let registry = PoolRegistry::new();
        let address = Address::repeat_byte(0x01);
        registry.insert(PoolAggregate::new(address));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.addresses(), vec![address]);

        let mut snapshot = registry.snapshot(&address).unwrap();
        snapshot.block_number = 9;
        assert_eq!(registry.snapshot(&address).unwrap().block_number, 0);

        assert!(registry.commit(snapshot));
        assert_eq!(registry.snapshot(&address).unwrap().block_number, 9);

        let removed = registry.remove(&address).unwrap();
        assert_eq!(removed.block_number, 9);
        assert!(registry.is_empty());
        assert!(!registry.commit(PoolAggregate::new(address)));
    }

    #[test]
    fn test_apply_on_unknown_venue() {
        let registry = PoolRegistry::new();
        let outcome = SwapOutcome {
            source: empty_update(),
            destination: empty_update(),
        };
        assert!(matches!(
            registry.apply(&Address::repeat_byte(0x02), &outcome),
            Err(PoolError::UnknownPool(_))
        ));
    }
}
