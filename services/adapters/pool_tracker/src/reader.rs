//! Contract-read transport seam
//!
//! The synchronizer only ever issues batches: every call in one
//! [`ContractReader::aggregate`] observes the same block.

use async_trait::async_trait;
use ethabi::{Function, Token};
use ethers_core::types::Address;

use crate::error::ReadError;

#[derive(Debug, Clone)]
pub struct ContractCall {
    pub target: Address,
    pub function: Function,
    pub params: Vec<Token>,
}

impl ContractCall {
    pub fn new(target: Address, function: Function, params: Vec<Token>) -> Self {
        Self {
            target,
            function,
            params,
        }
    }

    /// Call without arguments
    pub fn view(target: Address, function: Function) -> Self {
        Self::new(target, function, Vec::new())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ReadError> {
        Ok(self.function.encode_input(&self.params)?)
    }

    pub fn decode(&self, output: &[u8]) -> Result<Vec<Token>, ReadError> {
        Ok(self.function.decode_output(output)?)
    }
}

/// Results of one batch, in call order
#[derive(Debug)]
pub struct BatchResponse {
    /// Height every call in the batch was executed at
    pub block_number: u64,
    /// One entry per call; a revert or undecodable reply fails only its own entry
    pub results: Vec<Result<Vec<Token>, ReadError>>,
}

impl BatchResponse {
    /// All results, failing on the first call that did not succeed
    pub fn into_required(self) -> Result<Vec<Vec<Token>>, ReadError> {
        self.results.into_iter().collect()
    }
}

#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Execute `calls` in one round trip at `block`, or at the latest block
    /// when `block` is `None`
    async fn aggregate(
        &self,
        calls: Vec<ContractCall>,
        block: Option<u64>,
    ) -> Result<BatchResponse, ReadError>;
}
