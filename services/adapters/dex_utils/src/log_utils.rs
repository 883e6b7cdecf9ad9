//! Helpers over raw log batches

use web3::types::Log;

/// True when any log in the batch was removed by a chain reorganisation
pub fn has_reverted_log(logs: &[Log]) -> bool {
    logs.iter().any(|log| log.removed == Some(true))
}

/// Highest block number carried by the batch
pub fn latest_block_number(logs: &[Log]) -> Option<u64> {
    logs.iter()
        .filter_map(|log| log.block_number)
        .map(|n| n.as_u64())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use web3::types::{Bytes, H160, U64};

    fn log(block: Option<u64>, removed: Option<bool>) -> Log {
        Log {
            address: H160::zero(),
            topics: vec![],
            data: Bytes(vec![]),
            block_hash: None,
            block_number: block.map(U64::from),
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            transaction_log_index: None,
            log_type: None,
            removed,
        }
    }

    #[test]
    fn test_reverted_log_detection() {
        assert!(!has_reverted_log(&[]));
        assert!(!has_reverted_log(&[log(Some(1), None), log(Some(2), Some(false))]));
        assert!(has_reverted_log(&[log(Some(1), None), log(Some(2), Some(true))]));
    }

    #[test]
    fn test_latest_block_number() {
        assert_eq!(latest_block_number(&[]), None);
        assert_eq!(
            latest_block_number(&[log(Some(7), None), log(None, None), log(Some(12), None)]),
            Some(12)
        );
    }
}
