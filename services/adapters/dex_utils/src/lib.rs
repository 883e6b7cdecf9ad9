//! Nabla contract ABI library
//!
//! Shared ABI definitions and event decoding used by the pool state and the
//! tracker service.
//!
//! # Architecture
//!
//! ```text
//! dex_utils/
//! ├── abi/
//! │   ├── nabla.rs    # Function and event ABIs
//! │   └── events.rs   # Typed event decoder
//! ├── event_signatures.rs
//! └── log_utils.rs    # Reorg and block-height helpers
//! ```

pub mod abi;
pub mod event_signatures;
pub mod log_utils;

// Re-export commonly used types
pub use abi::{
    get_all_event_signatures, nabla, DecodingError, NablaEvent, NablaEventDecoder,
    NablaEventKind,
};

pub use event_signatures::{
    get_all_nabla_signatures, to_hex_string, PRICE_FEED_UPDATE, RESERVE_UPDATED, SWAP_FEES_SET,
};

pub use log_utils::{has_reverted_log, latest_block_number};
