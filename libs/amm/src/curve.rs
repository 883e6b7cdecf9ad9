//! Nabla slippage curve
//!
//! The curve maps a sub-pool's raw reserve `b` and liabilities `l` to the
//! slippage-adjusted reserve
//!
//! ```text
//! psi(b, l) = b + beta * (b - l)^2 / (b + c * l)
//! ```
//!
//! Swaps move along it in two ways. The source side is moved horizontally:
//! liabilities stay fixed and we solve for the raw reserve change that lands
//! on a target slippage-adjusted reserve. The destination side is moved
//! diagonally: reserve and liabilities grow by the same LP fee. Both inverses
//! reduce to a quadratic and share [`solve_quadratic`].

use ethers_core::types::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::fixed_point::{self as fp, MathResult, ONE};

/// Curve coefficients as read from the curve contract's `params()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NablaCurve {
    #[serde(with = "crate::serde_decimal")]
    pub beta: I256,
    #[serde(with = "crate::serde_decimal")]
    pub c: I256,
}

impl NablaCurve {
    pub fn new(beta: I256, c: I256) -> Self {
        Self { beta, c }
    }

    /// Coefficients carried by the deployed curve contracts
    pub fn deployed() -> Self {
        Self::new(
            I256::from(5_000_000_000_000_000i64),
            I256::from_raw(U256::from(17_075_887_234_393_789_126u64)),
        )
    }

    /// Slippage-adjusted reserve for `reserve` and `liabilities` in token decimals
    pub fn psi(&self, reserve: I256, liabilities: I256, decimals: u8) -> MathResult<I256> {
        let b = fp::normalize(reserve, decimals)?;
        let l = fp::normalize(liabilities, decimals)?;
        if b.is_zero() && l.is_zero() {
            return Ok(I256::zero());
        }

        let diff = fp::sub(b, l)?.abs();
        let numerator = fp::mul(self.beta, fp::mul(diff, diff)?)?;
        let denominator = fp::add(b, fp::mul(self.c, l)?)?;
        let adjusted = fp::add(b, fp::div(numerator, denominator)?)?;

        fp::denormalize(adjusted, decimals)
    }

    /// Raw reserve increase that moves `psi` from its current value to
    /// `target` while liabilities stay fixed
    ///
    /// With `t` the increase, `psi(b + t, l) = B` expands to
    /// `(1 + beta) t^2 + qb t + qc = 0` where
    /// `qb = 2b + c*l + 2*beta*(b - l) - B` and
    /// `qc = (b - B)(b + c*l) + beta*(b - l)^2`.
    pub fn inverse_horizontal(
        &self,
        reserve: I256,
        liabilities: I256,
        target: I256,
        decimals: u8,
    ) -> MathResult<I256> {
        let b = fp::normalize(reserve, decimals)?;
        let l = fp::normalize(liabilities, decimals)?;
        let target = fp::normalize(target, decimals)?;

        let two = I256::from(2);
        let cl = fp::mul(self.c, l)?;
        let b_minus_l = fp::sub(b, l)?;

        let qa = fp::add(*ONE, self.beta)?;
        let mut qb = fp::add(fp::mul_int(two, b)?, cl)?;
        qb = fp::add(qb, fp::mul_int(two, fp::mul(self.beta, b_minus_l)?)?)?;
        qb = fp::sub(qb, target)?;
        let qc = self.constant_term(b, cl, b_minus_l, target)?;

        fp::denormalize(solve_quadratic(qa, qb, qc)?, decimals)
    }

    /// LP fee `t` such that `psi(b + t, l + t)` equals `target`
    ///
    /// Expands to `(1 + c) t^2 + qb t + qc = 0` with
    /// `qb = (b - B)(1 + c) + b + c*l` and the same constant term as the
    /// horizontal inverse.
    pub fn inverse_diagonal(
        &self,
        reserve: I256,
        liabilities: I256,
        target: I256,
        decimals: u8,
    ) -> MathResult<I256> {
        let b = fp::normalize(reserve, decimals)?;
        let l = fp::normalize(liabilities, decimals)?;
        let target = fp::normalize(target, decimals)?;

        let cl = fp::mul(self.c, l)?;
        let b_minus_l = fp::sub(b, l)?;
        let one_plus_c = fp::add(*ONE, self.c)?;

        let qa = one_plus_c;
        let mut qb = fp::mul(fp::sub(b, target)?, one_plus_c)?;
        qb = fp::add(fp::add(qb, b)?, cl)?;
        let qc = self.constant_term(b, cl, b_minus_l, target)?;

        fp::denormalize(solve_quadratic(qa, qb, qc)?, decimals)
    }

    fn constant_term(&self, b: I256, cl: I256, b_minus_l: I256, target: I256) -> MathResult<I256> {
        let shifted = fp::mul(fp::sub(b, target)?, fp::add(b, cl)?)?;
        let curvature = fp::mul(self.beta, fp::mul(b_minus_l, b_minus_l)?)?;
        fp::add(shifted, curvature)
    }
}

/// Larger root of `a t^2 + b t + c = 0` in 18-decimal fixed point
///
/// A negative discriminant is clamped to zero and so is a negative root, so
/// an unreachable target yields zero rather than an error.
pub fn solve_quadratic(a: I256, b: I256, c: I256) -> MathResult<I256> {
    let four = I256::from(4);
    let two = I256::from(2);

    let discriminant = fp::sub(fp::mul(b, b)?, fp::mul_int(four, fp::mul(a, c)?)?)?;
    let discriminant = discriminant.max(I256::zero());

    let numerator = fp::add(-b, fp::sqrt(discriminant)?)?;
    let root = fp::div(numerator, fp::mul_int(two, a)?)?;

    Ok(root.max(I256::zero()))
}
