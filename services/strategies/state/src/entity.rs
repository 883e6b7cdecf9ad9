//! Persisted pool form
//!
//! The shape the routing engine stores per venue: a flat token list, reserve
//! figures as decimal strings and an opaque JSON `extra` blob carrying the
//! sub-pools. Amounts never travel as JSON numbers.

use std::str::FromStr;

use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};

use crate::pool_state::{NablaPool, PoolAggregate, PoolError, PoolToken};

pub const EXCHANGE: &str = "nabla";
pub const POOL_TYPE: &str = "nabla";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityToken {
    pub address: String,
    pub decimals: u8,
    pub swappable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntity {
    pub address: String,
    pub exchange: String,
    pub pool_type: String,
    pub tokens: Vec<EntityToken>,
    /// Raw reserve per token, native decimals
    pub reserves: Vec<String>,
    /// JSON-encoded [`Extra`]
    pub extra: String,
    pub block_number: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extra {
    pub pools: Vec<NablaPool>,
    pub dependencies_stored: bool,
    /// 0x-prefixed feed id per token, `null` when the adapter has none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub price_feed_ids: Vec<Option<String>>,
    /// Hex without prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_feed_data: Option<String>,
}

fn format_address(address: &Address) -> String {
    format!("{:?}", address)
}

fn parse_address(value: &str) -> Result<Address, PoolError> {
    Address::from_str(value.trim_start_matches("0x"))
        .map_err(|_| PoolError::InvalidAddress(value.to_string()))
}

fn parse_feed_id(value: &str) -> Result<H256, PoolError> {
    H256::from_str(value.trim_start_matches("0x"))
        .map_err(|_| PoolError::InvalidFeedId(value.to_string()))
}

impl PoolAggregate {
    pub fn to_entity(&self) -> Result<PoolEntity, PoolError> {
        let extra = Extra {
            pools: self.pools.clone(),
            dependencies_stored: self.dependencies_complete,
            price_feed_ids: self
                .price_feed_ids
                .iter()
                .map(|id| id.map(|id| format!("{:?}", id)))
                .collect(),
            price_feed_data: self.price_update_data.as_ref().map(hex::encode),
        };

        Ok(PoolEntity {
            address: format_address(&self.address),
            exchange: EXCHANGE.to_string(),
            pool_type: POOL_TYPE.to_string(),
            tokens: self
                .tokens
                .iter()
                .map(|token| EntityToken {
                    address: format_address(&token.address),
                    decimals: token.decimals,
                    swappable: true,
                })
                .collect(),
            reserves: self
                .pools
                .iter()
                .map(|pool| pool.state.reserve.to_string())
                .collect(),
            extra: serde_json::to_string(&extra)?,
            block_number: self.block_number,
            timestamp: self.timestamp,
        })
    }

    pub fn from_entity(entity: &PoolEntity) -> Result<Self, PoolError> {
        let extra: Extra = serde_json::from_str(&entity.extra)?;

        let tokens = entity
            .tokens
            .iter()
            .map(|token| {
                Ok(PoolToken {
                    address: parse_address(&token.address)?,
                    decimals: token.decimals,
                })
            })
            .collect::<Result<Vec<_>, PoolError>>()?;

        let price_update_data = match extra.price_feed_data {
            Some(data) => Some(
                hex::decode(data.trim_start_matches("0x"))
                    .map_err(|e| PoolError::InvalidReserves(format!("price payload: {}", e)))?,
            ),
            None => None,
        };

        let price_feed_ids = extra
            .price_feed_ids
            .iter()
            .map(|id| id.as_deref().map(parse_feed_id).transpose())
            .collect::<Result<Vec<_>, PoolError>>()?;

        let aggregate = PoolAggregate {
            address: parse_address(&entity.address)?,
            tokens,
            pools: extra.pools,
            block_number: entity.block_number,
            timestamp: entity.timestamp,
            dependencies_complete: extra.dependencies_stored,
            price_feed_ids,
            price_update_data,
        };
        aggregate.validate()?;
        Ok(aggregate)
    }
}
