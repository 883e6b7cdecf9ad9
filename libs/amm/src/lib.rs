//! # Nabla AMM Library - Slippage Curve Mathematics
//!
//! ## Purpose
//!
//! Integer-exact replica of the Nabla swap math: the 18-decimal fixed-point
//! kernel, the slippage curve with its horizontal and diagonal inverses, and
//! the two-sided swap quotation. Quotes computed here must match the deployed
//! router to the wei, so every rounding step follows the contracts.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Sub-pool state cached by `nabla-state`, curve
//!   coefficients and fee rates read by `nabla-tracker`
//! - **Output Destinations**: `PoolAggregate::quote` and router consumers
//! - **Precision**: Token amounts stay in token decimals, curve evaluation
//!   runs in 18 decimals, prices carry 8 decimals
//!
//! ## Architecture Role
//!
//! ```text
//! fixed_point ──> curve ──> swap ──> SwapSimulator implementors
//! ```
//!
//! Nothing in this crate performs I/O or holds state between calls.

pub mod curve;
pub mod fixed_point;
pub mod pool_traits;
pub mod serde_decimal;
pub mod swap;

pub use curve::{solve_quadratic, NablaCurve};
pub use fixed_point::{MathError, MathResult, MATH_DECIMALS, ONE};
pub use pool_traits::SwapSimulator;
pub use swap::{
    FeeBreakdown, SubPool, SubPoolMeta, SubPoolState, SwapError, SwapMath, SwapResult,
    FEE_PRECISION, PRICE_PRECISION,
};

/// Signed 256-bit integer used for every amount, price and coefficient
pub use ethers_core::types::I256;
