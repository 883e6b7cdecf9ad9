//! Synchronizer error types

use std::time::Duration;

use nabla_dex::DecodingError;
use nabla_state::PoolError;
use thiserror::Error;

/// Failure of a single contract read or of the transport carrying it
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Read timed out after {0:?}")]
    Timeout(Duration),

    #[error("ABI error: {0}")]
    Abi(#[from] ethabi::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Event decoding failed: {0}")]
    Decode(#[from] DecodingError),

    #[error("Unexpected contract response: {0}")]
    Malformed(String),

    #[error("Invalid address in configuration: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
