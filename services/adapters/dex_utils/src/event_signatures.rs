//! Nabla event signature constants
//!
//! keccak256 of the canonical Solidity event definitions. Used to classify
//! logs and to build log filters.

use web3::types::H256;

/// Swap pool ReserveUpdated event signature
/// keccak256("ReserveUpdated(uint256,uint256,uint256)")
pub const RESERVE_UPDATED: H256 = H256([
    0x73, 0x6a, 0x4a, 0x58, 0x12, 0xce, 0xd5, 0x78, 0x65, 0xd3, 0x49, 0xf1, 0x8f, 0xfc, 0x35, 0x80,
    0x79, 0xc6, 0xb4, 0x79, 0x32, 0x6c, 0x0d, 0xfd, 0x1d, 0xae, 0x30, 0xc4, 0x65, 0xb1, 0xda, 0xf2,
]);

/// Swap pool SwapFeesSet event signature
/// keccak256("SwapFeesSet(address,uint256,uint256,uint256)")
pub const SWAP_FEES_SET: H256 = H256([
    0xd5, 0x18, 0x91, 0xe6, 0xac, 0x27, 0xda, 0x60, 0x65, 0x76, 0x0e, 0x48, 0x43, 0xc6, 0x3b, 0xeb,
    0x01, 0x79, 0x55, 0x31, 0xa5, 0xc0, 0x17, 0xb2, 0x9f, 0x95, 0x9a, 0x4c, 0x10, 0x55, 0xc4, 0x98,
]);

/// Oracle PriceFeedUpdate event signature
/// keccak256("PriceFeedUpdate(bytes32,uint64,int64,uint64)")
pub const PRICE_FEED_UPDATE: H256 = H256([
    0xd0, 0x6a, 0x6b, 0x7f, 0x49, 0x18, 0x49, 0x4b, 0x37, 0x19, 0x21, 0x7d, 0x18, 0x02, 0x78, 0x6c,
    0x1f, 0x51, 0x12, 0xa6, 0xc1, 0xd8, 0x8f, 0xe2, 0xcf, 0xec, 0x00, 0xb4, 0x58, 0x4f, 0x6a, 0xec,
]);

/// All signatures the tracker consumes, for log filters
pub const fn get_all_nabla_signatures() -> [H256; 3] {
    [RESERVE_UPDATED, SWAP_FEES_SET, PRICE_FEED_UPDATE]
}

/// Convert H256 to hex string for JSON-RPC use
pub fn to_hex_string(hash: H256) -> String {
    format!("0x{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::nabla;

    #[test]
    fn verify_reserve_updated_signature() {
        let computed = nabla::reserve_updated_event().signature();
        assert_eq!(
            computed, RESERVE_UPDATED,
            "ReserveUpdated signature mismatch: computed={:x}, constant={:x}",
            computed, RESERVE_UPDATED
        );
    }

    #[test]
    fn verify_swap_fees_set_signature() {
        let computed = nabla::swap_fees_set_event().signature();
        assert_eq!(
            computed, SWAP_FEES_SET,
            "SwapFeesSet signature mismatch: computed={:x}, constant={:x}",
            computed, SWAP_FEES_SET
        );
    }

    #[test]
    fn verify_price_feed_update_signature() {
        let computed = nabla::price_feed_update_event().signature();
        assert_eq!(
            computed, PRICE_FEED_UPDATE,
            "PriceFeedUpdate signature mismatch: computed={:x}, constant={:x}",
            computed, PRICE_FEED_UPDATE
        );
    }

    #[test]
    fn verify_string_conversion() {
        assert_eq!(
            to_hex_string(RESERVE_UPDATED),
            "0x736a4a5812ced57865d349f18ffc358079c6b479326c0dfd1dae30c465b1daf2"
        );
        assert_eq!(
            to_hex_string(PRICE_FEED_UPDATE),
            "0xd06a6b7f4918494b3719217d1802786c1f5112a6c1d88fe2cfec00b4584f6aec"
        );
    }
}
