//! Nabla event structures and decoders
//!
//! Classifies logs by topic0 and decodes them with ethabi into typed events.
//! Amounts are converted to signed 256-bit values so they can be written
//! straight into sub-pool state.

use super::nabla;
use crate::event_signatures::{PRICE_FEED_UPDATE, RESERVE_UPDATED, SWAP_FEES_SET};
use ethabi::{Event, RawLog, Token};
use ethers_core::types::I256;
use nabla_amm::fixed_point;
use web3::types::{Log, H160, H256, U256};

/// Error types for ABI decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    #[error("ABI parsing failed: {0}")]
    AbiParsingError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Value overflow: {value} exceeds int256::MAX")]
    ValueOverflow { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NablaEventKind {
    /// Swap pool figures after a swap, deposit or withdrawal
    ReserveUpdated {
        reserve: I256,
        reserve_with_slippage: I256,
        total_liabilities: I256,
    },
    /// New fee rates, in millionths
    SwapFeesSet {
        lp_fee: I256,
        backstop_fee: I256,
        protocol_fee: I256,
    },
    /// Oracle price push for one feed
    PriceFeedUpdate {
        feed_id: H256,
        price: I256,
        publish_time: u64,
    },
}

/// Decoded log with its position in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NablaEvent {
    /// Emitting contract
    pub address: H160,
    pub block_number: u64,
    pub log_index: u64,
    pub kind: NablaEventKind,
}

impl NablaEvent {
    /// Replay ordering key: block height, then position within the block
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// ABI decoder for Nabla events
pub struct NablaEventDecoder;

impl NablaEventDecoder {
    /// Decode a log, returning `Ok(None)` for topics that are not Nabla events
    pub fn decode(log: &Log) -> Result<Option<NablaEvent>, DecodingError> {
        let topic0 = match log.topics.first() {
            Some(topic) => *topic,
            None => return Ok(None),
        };

        let kind = if topic0 == RESERVE_UPDATED {
            Self::decode_reserve_updated(log)?
        } else if topic0 == SWAP_FEES_SET {
            Self::decode_swap_fees_set(log)?
        } else if topic0 == PRICE_FEED_UPDATE {
            Self::decode_price_feed_update(log)?
        } else {
            return Ok(None);
        };

        let block_number = log
            .block_number
            .ok_or_else(|| DecodingError::MissingField("block_number".to_string()))?
            .as_u64();
        let log_index = log
            .log_index
            .ok_or_else(|| DecodingError::MissingField("log_index".to_string()))?
            .low_u64();

        Ok(Some(NablaEvent {
            address: log.address,
            block_number,
            log_index,
            kind,
        }))
    }

    fn decode_reserve_updated(log: &Log) -> Result<NablaEventKind, DecodingError> {
        let decoded = Self::parse(nabla::reserve_updated_event(), log)?;

        Ok(NablaEventKind::ReserveUpdated {
            reserve: Self::uint_param(&decoded, "newReserve")?,
            reserve_with_slippage: Self::uint_param(&decoded, "newReserveWithSlippage")?,
            total_liabilities: Self::uint_param(&decoded, "newTotalLiabilities")?,
        })
    }

    fn decode_swap_fees_set(log: &Log) -> Result<NablaEventKind, DecodingError> {
        let decoded = Self::parse(nabla::swap_fees_set_event(), log)?;

        Ok(NablaEventKind::SwapFeesSet {
            lp_fee: Self::uint_param(&decoded, "lpFee")?,
            backstop_fee: Self::uint_param(&decoded, "backstopFee")?,
            protocol_fee: Self::uint_param(&decoded, "protocolFee")?,
        })
    }

    fn decode_price_feed_update(log: &Log) -> Result<NablaEventKind, DecodingError> {
        let decoded = Self::parse(nabla::price_feed_update_event(), log)?;

        let feed_id = Self::param(&decoded, "id")?
            .into_fixed_bytes()
            .filter(|bytes| bytes.len() == 32)
            .map(|bytes| H256::from_slice(&bytes))
            .ok_or_else(|| DecodingError::MissingField("id".to_string()))?;

        // int64 arrives sign-extended to 256 bits
        let price = Self::param(&decoded, "price")?
            .into_int()
            .map(I256::from_raw)
            .ok_or_else(|| DecodingError::MissingField("price".to_string()))?;

        let publish_time = Self::param(&decoded, "publishTime")?
            .into_uint()
            .map(|t| t.low_u64())
            .ok_or_else(|| DecodingError::MissingField("publishTime".to_string()))?;

        Ok(NablaEventKind::PriceFeedUpdate {
            feed_id,
            price,
            publish_time,
        })
    }

    fn parse(event: Event, log: &Log) -> Result<ethabi::Log, DecodingError> {
        let raw_log = RawLog {
            topics: log.topics.clone(),
            data: log.data.0.clone(),
        };
        event
            .parse_log(raw_log)
            .map_err(|e| DecodingError::AbiParsingError(e.to_string()))
    }

    fn param(decoded: &ethabi::Log, name: &str) -> Result<Token, DecodingError> {
        decoded
            .params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.clone())
            .ok_or_else(|| DecodingError::MissingField(name.to_string()))
    }

    fn uint_param(decoded: &ethabi::Log, name: &str) -> Result<I256, DecodingError> {
        let value = Self::param(decoded, name)?
            .into_uint()
            .ok_or_else(|| DecodingError::MissingField(name.to_string()))?;
        safe_u256_to_i256(value)
    }
}

/// Convert an on-chain `uint256` to a signed value, rejecting the top bit
pub fn safe_u256_to_i256(value: U256) -> Result<I256, DecodingError> {
    fixed_point::from_unsigned(value).map_err(|_| DecodingError::ValueOverflow {
        value: value.to_string(),
    })
}
