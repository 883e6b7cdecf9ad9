//! Pool trait definitions for swap simulation

use ethers_core::types::I256;

/// Unified interface a router uses to simulate swaps against a cached pool
///
/// `Clone` must produce a fully independent copy: simulating on a clone and
/// applying outcomes to it never affects the original.
pub trait SwapSimulator: Clone {
    type Token;
    type Quote;
    type Outcome;
    type Metadata;
    type Error;

    /// Quote `amount_in` of `token_in` into `token_out` without mutating state
    fn quote(
        &self,
        token_in: &Self::Token,
        token_out: &Self::Token,
        amount_in: I256,
    ) -> Result<Self::Quote, Self::Error>;

    /// Commit the post-swap state carried by a previous quote
    fn apply(&mut self, outcome: &Self::Outcome) -> Result<(), Self::Error>;

    /// Routing metadata for this pool
    fn describe(&self) -> Self::Metadata;

    /// Tradable tokens, in pool order
    fn tokens(&self) -> Vec<Self::Token>;
}
