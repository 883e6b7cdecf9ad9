//! ABI definitions and event decoding for Nabla contracts
//!
//! This module provides:
//! - Function ABIs for the batched state reads
//! - Event ABIs and a typed decoder for the events that change pool state

pub mod events;
pub mod nabla;

// Re-export main components
pub use events::{DecodingError, NablaEvent, NablaEventDecoder, NablaEventKind};

/// Get event signatures for log subscription
pub fn get_all_event_signatures() -> Vec<String> {
    vec![
        format!("0x{:x}", nabla::reserve_updated_event().signature()),
        format!("0x{:x}", nabla::swap_fees_set_event().signature()),
        format!("0x{:x}", nabla::price_feed_update_event().signature()),
    ]
}
