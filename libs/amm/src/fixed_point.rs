//! Signed fixed-point kernel with 18 decimals
//!
//! Every operation is integer-exact and truncates toward zero, which is what
//! the on-chain `int256` arithmetic does. Any deviation here shows up as a
//! wei-level mismatch against the deployed contracts.

use ethers_core::types::{I256, U256};
use once_cell::sync::Lazy;
use thiserror::Error;

/// Decimals of the internal math representation
pub const MATH_DECIMALS: u8 = 18;

/// Fixed-point one, 10^18
pub static ONE: Lazy<I256> = Lazy::new(|| I256::from(1_000_000_000_000_000_000i64));

/// Number of Newton iterations used by [`sqrt`]
const SQRT_ITERATIONS: usize = 7;

/// Largest exponent for which 10^n still fits a signed 256-bit integer
const MAX_POW10: u32 = 76;

static POW10: Lazy<Vec<I256>> = Lazy::new(|| {
    let ten = I256::from(10);
    let mut table = Vec::with_capacity(MAX_POW10 as usize + 1);
    let mut value = I256::one();
    table.push(value);
    for _ in 0..MAX_POW10 {
        value = value * ten;
        table.push(value);
    }
    table
});

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("square root of a negative value")]
    NegativeSqrt,
}

pub type MathResult<T> = Result<T, MathError>;

/// 10^n as a signed 256-bit value
pub fn ten_pow(n: u32) -> MathResult<I256> {
    POW10.get(n as usize).copied().ok_or(MathError::Overflow)
}

pub fn add(a: I256, b: I256) -> MathResult<I256> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn sub(a: I256, b: I256) -> MathResult<I256> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

/// Reinterpret an on-chain `uint256` as a signed value
pub fn from_unsigned(value: U256) -> MathResult<I256> {
    I256::try_from(value).map_err(|_| MathError::Overflow)
}

/// Plain integer product, no rescaling
pub fn mul_int(a: I256, b: I256) -> MathResult<I256> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// Plain integer quotient truncated toward zero, no rescaling
pub fn div_int(a: I256, b: I256) -> MathResult<I256> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    a.checked_div(b).ok_or(MathError::Overflow)
}

/// Fixed-point product: `a * b / 10^18`
pub fn mul(a: I256, b: I256) -> MathResult<I256> {
    div_int(mul_int(a, b)?, *ONE)
}

/// Fixed-point quotient: `a * 10^18 / b`
pub fn div(a: I256, b: I256) -> MathResult<I256> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    div_int(mul_int(a, *ONE)?, b)
}

/// Fixed-point square root
///
/// Seeds Newton's method with `2^(bitlen(a * 10^18) / 2)`, runs a fixed
/// number of iterations and returns the smaller of the estimate and its
/// cofactor. Negative inputs are rejected and zero maps to zero.
pub fn sqrt(a: I256) -> MathResult<I256> {
    if a.is_negative() {
        return Err(MathError::NegativeSqrt);
    }
    let scaled = mul_int(a, *ONE)?;
    if scaled.is_zero() {
        return Ok(I256::zero());
    }

    let scaled = scaled.unsigned_abs();
    let mut estimate = U256::one() << (scaled.bits() / 2);
    for _ in 0..SQRT_ITERATIONS {
        let quotient = scaled
            .checked_div(estimate)
            .ok_or(MathError::DivisionByZero)?;
        estimate = (estimate + quotient) >> 1;
    }
    let cofactor = scaled
        .checked_div(estimate)
        .ok_or(MathError::DivisionByZero)?;

    I256::try_from(estimate.min(cofactor)).map_err(|_| MathError::Overflow)
}

/// Rescale `x` between decimal precisions
///
/// Scaling up multiplies by `10^(to - from)`, scaling down divides and
/// truncates toward zero.
pub fn to_decimals(x: I256, from: u8, to: u8) -> MathResult<I256> {
    match from.cmp(&to) {
        std::cmp::Ordering::Equal => Ok(x),
        std::cmp::Ordering::Less => mul_int(x, ten_pow(u32::from(to - from))?),
        std::cmp::Ordering::Greater => div_int(x, ten_pow(u32::from(from - to))?),
    }
}

/// Bring a token-denominated amount into the 18-decimal math domain
pub fn normalize(x: I256, decimals: u8) -> MathResult<I256> {
    to_decimals(x, decimals, MATH_DECIMALS)
}

/// Bring an 18-decimal math value back to token decimals
pub fn denormalize(x: I256, decimals: u8) -> MathResult<I256> {
    to_decimals(x, MATH_DECIMALS, decimals)
}
