//! Swap quotation across two Nabla sub-pools
//!
//! A swap credits the source sub-pool along its horizontal curve path,
//! converts the credited amount through the oracle price ratio, charges the
//! protocol, backstop and LP fees, and debits the destination sub-pool along
//! its diagonal path. The result carries both post-swap states so callers can
//! commit them without recomputing anything.

use ethers_core::types::I256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::NablaCurve;
use crate::fixed_point::{self as fp, MathError, MathResult};

/// Oracle prices carry 8 decimals
pub const PRICE_PRECISION: i64 = 100_000_000;

/// Fee rates and coverage ratios are expressed in millionths
pub const FEE_PRECISION: i64 = 1_000_000;

/// Source reserve may not exceed 199% of its liabilities after a swap
const MAX_COVERAGE_NUMERATOR: i64 = 199;
const MAX_COVERAGE_DENOMINATOR: i64 = 100;

/// Destination slippage-adjusted reserve must stay above 1% of liabilities
const MIN_COVERAGE_RATIO: i64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("token is not part of the pool")]
    InvalidToken,

    #[error("destination reserve cannot cover the swap")]
    InsufficientReserves,

    #[error("oracle price missing for one side of the swap")]
    StalePrice,

    #[error("swap would be rejected on-chain")]
    ZeroSwap,

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

/// Slowly changing sub-pool parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPoolMeta {
    pub curve: NablaCurve,
    #[serde(with = "crate::serde_decimal")]
    pub lp_fee: I256,
    #[serde(with = "crate::serde_decimal")]
    pub backstop_fee: I256,
    #[serde(with = "crate::serde_decimal")]
    pub protocol_fee: I256,
}

/// Per-block sub-pool figures, all in token decimals except the price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPoolState {
    #[serde(with = "crate::serde_decimal")]
    pub reserve: I256,
    #[serde(with = "crate::serde_decimal")]
    pub reserve_with_slippage: I256,
    #[serde(with = "crate::serde_decimal")]
    pub total_liabilities: I256,
    /// Oracle price with 8 decimals, `None` until one has been fetched
    #[serde(with = "crate::serde_decimal::option")]
    pub price: Option<I256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPool {
    pub meta: SubPoolMeta,
    pub state: SubPoolState,
}

impl SubPool {
    pub fn new(meta: SubPoolMeta, state: SubPoolState) -> Self {
        Self { meta, state }
    }
}

/// Fees charged by a swap, denominated in the destination token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    #[serde(with = "crate::serde_decimal")]
    pub lp: I256,
    #[serde(with = "crate::serde_decimal")]
    pub backstop: I256,
    #[serde(with = "crate::serde_decimal")]
    pub protocol: I256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
    pub amount_out: I256,
    pub fees: FeeBreakdown,
    pub source: SubPoolState,
    pub destination: SubPoolState,
}

/// Nabla swap math
pub struct SwapMath;

impl SwapMath {
    /// Quote `amount_in` of the source token (in source decimals) into the
    /// destination sub-pool
    ///
    /// Pure: neither sub-pool is modified. Rejections mirror the on-chain
    /// router, so anything the contracts would revert on comes back as
    /// [`SwapError::ZeroSwap`].
    pub fn quote(
        source: &SubPool,
        destination: &SubPool,
        amount_in: I256,
        source_decimals: u8,
        destination_decimals: u8,
    ) -> Result<SwapResult, SwapError> {
        let source_price = source.state.price.ok_or(SwapError::StalePrice)?;
        let destination_price = destination.state.price.ok_or(SwapError::StalePrice)?;

        if amount_in <= I256::zero() {
            return Err(SwapError::ZeroSwap);
        }

        let src = &source.state;
        let dst = &destination.state;

        let relative_price = fp::div_int(
            fp::mul_int(source_price, I256::from(PRICE_PRECISION))?,
            destination_price,
        )?;

        // Source side: horizontal move onto the credited slippage-adjusted reserve
        let target = fp::add(src.reserve_with_slippage, amount_in)?;
        let effective_amount_in = source.meta.curve.inverse_horizontal(
            src.reserve,
            src.total_liabilities,
            target,
            source_decimals,
        )?;
        if effective_amount_in <= I256::zero() {
            return Err(SwapError::ZeroSwap);
        }

        let new_source_reserve = fp::add(src.reserve, effective_amount_in)?;
        let coverage_cap = fp::div_int(
            fp::mul_int(src.total_liabilities, I256::from(MAX_COVERAGE_NUMERATOR))?,
            I256::from(MAX_COVERAGE_DENOMINATOR),
        )?;
        if new_source_reserve > coverage_cap {
            return Err(SwapError::ZeroSwap);
        }

        let (numerator, denominator) = scaling_factor(source_decimals, destination_decimals)?;
        let raw_amount_out = fp::div_int(
            fp::mul_int(fp::mul_int(effective_amount_in, relative_price)?, numerator)?,
            denominator,
        )?;

        let backstop_fee = fee_amount(raw_amount_out, destination.meta.backstop_fee)?;
        let protocol_fee = fee_amount(raw_amount_out, destination.meta.protocol_fee)?;
        let max_lp_fee = fee_amount(raw_amount_out, destination.meta.lp_fee)?;

        // Destination side: the LP fee is whatever brings psi back to its
        // pre-swap level, capped by the configured rate
        let reduced_reserve = fp::add(
            fp::add(fp::sub(dst.reserve, raw_amount_out)?, backstop_fee)?,
            protocol_fee,
        )?;
        let lp_fee = destination
            .meta
            .curve
            .inverse_diagonal(
                reduced_reserve,
                dst.total_liabilities,
                dst.reserve_with_slippage,
                destination_decimals,
            )?
            .min(max_lp_fee);

        let new_destination_reserve = fp::add(reduced_reserve, lp_fee)?;
        let new_destination_liabilities = fp::add(dst.total_liabilities, lp_fee)?;
        let new_destination_rws = destination
            .meta
            .curve
            .psi(
                new_destination_reserve,
                new_destination_liabilities,
                destination_decimals,
            )?
            .min(dst.reserve_with_slippage);

        let floor = fp::div_int(
            fp::mul_int(dst.total_liabilities, I256::from(MIN_COVERAGE_RATIO))?,
            I256::from(FEE_PRECISION),
        )?;
        if new_destination_rws <= floor {
            return Err(SwapError::ZeroSwap);
        }

        let amount_out = fp::sub(dst.reserve_with_slippage, new_destination_rws)?;
        if amount_out <= I256::zero() {
            return Err(SwapError::ZeroSwap);
        }

        let new_source_rws =
            source
                .meta
                .curve
                .psi(new_source_reserve, src.total_liabilities, source_decimals)?;

        let source_state = SubPoolState {
            reserve: new_source_reserve,
            reserve_with_slippage: new_source_rws,
            total_liabilities: src.total_liabilities,
            price: src.price,
        };
        let destination_state = SubPoolState {
            reserve: new_destination_reserve,
            reserve_with_slippage: new_destination_rws,
            total_liabilities: new_destination_liabilities,
            price: dst.price,
        };
        if !source_state.is_non_negative() || !destination_state.is_non_negative() {
            return Err(SwapError::ZeroSwap);
        }

        Ok(SwapResult {
            amount_out,
            fees: FeeBreakdown {
                lp: lp_fee,
                backstop: backstop_fee,
                protocol: protocol_fee,
            },
            source: source_state,
            destination: destination_state,
        })
    }
}

impl SubPoolState {
    fn is_non_negative(&self) -> bool {
        !self.reserve.is_negative()
            && !self.reserve_with_slippage.is_negative()
            && !self.total_liabilities.is_negative()
    }
}

/// `rate` is in millionths of `amount`
fn fee_amount(amount: I256, rate: I256) -> MathResult<I256> {
    fp::div_int(fp::mul_int(amount, rate)?, I256::from(FEE_PRECISION))
}

/// Numerator and denominator turning `effective * relative_price` into
/// destination decimals, with the price precision folded into the denominator
fn scaling_factor(source_decimals: u8, destination_decimals: u8) -> MathResult<(I256, I256)> {
    let price_precision = I256::from(PRICE_PRECISION);
    if destination_decimals >= source_decimals {
        let numerator = fp::ten_pow(u32::from(destination_decimals - source_decimals))?;
        Ok((numerator, price_precision))
    } else {
        let shift = fp::ten_pow(u32::from(source_decimals - destination_decimals))?;
        Ok((I256::one(), fp::mul_int(price_precision, shift)?))
    }
}
