//! Chain verification: linkage and hash recomputation.
//!
//! A failed verification is an expected runtime outcome (tampered or
//! corrupted rows), so it is reported as a [`ChainReport`], not an error.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::types::BlockId;

/// Outcome of walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub valid: bool,
    pub message: String,
    /// The first offending block, when invalid.
    pub invalid_block: Option<BlockId>,
}

impl ChainReport {
    fn valid(message: &str) -> Self {
        Self {
            valid: true,
            message: message.to_string(),
            invalid_block: None,
        }
    }

    fn invalid(message: String, block: &Block) -> Self {
        Self {
            valid: false,
            message,
            invalid_block: Some(block.id),
        }
    }
}

/// Walks an ordered block sequence and checks its integrity.
///
/// By default positions 1.. are checked: each block must link to its
/// predecessor's hash and its own hash must recompute from its fields. The
/// genesis block is not checked. [`ChainVerifier::strict`] also recomputes
/// the genesis hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainVerifier {
    check_genesis: bool,
}

impl ChainVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A verifier that also recomputes the genesis block's own hash.
    pub fn strict() -> Self {
        Self {
            check_genesis: true,
        }
    }

    pub fn checks_genesis(&self) -> bool {
        self.check_genesis
    }

    /// Verify `blocks`, stopping at the first failure.
    pub fn verify(&self, blocks: &[Block]) -> ChainReport {
        let Some(first) = blocks.first() else {
            return ChainReport::valid("Empty chain");
        };

        if self.check_genesis && first.compute_hash() != first.hash {
            return ChainReport::invalid("Invalid hash at block 0".to_string(), first);
        }

        for (i, pair) in blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let position = i + 1;

            if current.previous_hash != previous.hash {
                return ChainReport::invalid(
                    format!("Invalid previous hash at block {}", position),
                    current,
                );
            }

            if current.compute_hash() != current.hash {
                return ChainReport::invalid(format!("Invalid hash at block {}", position), current);
            }
        }

        ChainReport::valid("Chain is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockFactory;
    use crate::hasher::{EncryptionSecret, Hasher};
    use crate::miner::Miner;
    use crate::types::{TransactionId, UserId};
    use serde_json::json;

    fn make_chain() -> Vec<Block> {
        let factory = BlockFactory::new(
            Hasher::new(&EncryptionSecret::new("test-key")),
            Miner::new(2, 1_000_000).unwrap(),
        );
        let user = UserId::from("u1");
        let genesis = factory.create_genesis(&user).unwrap();
        let b1 = factory
            .create_block(
                &user,
                &TransactionId::from("t1"),
                &json!({"amount": 500, "type": "debit"}),
                &genesis,
            )
            .unwrap();
        let b2 = factory
            .create_block(
                &user,
                &TransactionId::from("t2"),
                &json!({"amount": 1200, "type": "credit"}),
                &b1,
            )
            .unwrap();
        vec![genesis, b1, b2]
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let report = ChainVerifier::new().verify(&[]);
        assert!(report.valid);
        assert_eq!(report.message, "Empty chain");
        assert!(report.invalid_block.is_none());
    }

    #[test]
    fn test_built_chain_is_valid() {
        let report = ChainVerifier::new().verify(&make_chain());
        assert!(report.valid);
        assert_eq!(report.message, "Chain is valid");
    }

    #[test]
    fn test_altered_hash_reported_at_that_block() {
        let mut chain = make_chain();
        chain[1].hash = format!("00{}", "f".repeat(62));

        let report = ChainVerifier::new().verify(&chain);
        assert!(!report.valid);
        assert_eq!(report.message, "Invalid hash at block 1");
        assert_eq!(report.invalid_block, Some(chain[1].id));
    }

    #[test]
    fn test_broken_link_reported() {
        let mut chain = make_chain();
        chain[2].previous_hash = "00deadbeef".to_string();

        let report = ChainVerifier::new().verify(&chain);
        assert!(!report.valid);
        assert_eq!(report.message, "Invalid previous hash at block 2");
        assert_eq!(report.invalid_block, Some(chain[2].id));
    }

    #[test]
    fn test_tampered_data_hash_detected() {
        let mut chain = make_chain();
        chain[2].data_hash = crate::hasher::digest("forged");

        let report = ChainVerifier::new().verify(&chain);
        assert_eq!(report.message, "Invalid hash at block 2");
        assert_eq!(report.invalid_block, Some(chain[2].id));
    }

    #[test]
    fn test_genesis_not_checked_by_default() {
        let mut chain = make_chain();
        chain[0].nonce += 1;

        assert!(ChainVerifier::new().verify(&chain).valid);
    }

    #[test]
    fn test_strict_checks_genesis() {
        let mut chain = make_chain();
        chain[0].nonce += 1;

        let report = ChainVerifier::strict().verify(&chain);
        assert!(!report.valid);
        assert_eq!(report.message, "Invalid hash at block 0");
        assert_eq!(report.invalid_block, Some(chain[0].id));
    }

    #[test]
    fn test_single_block_chain_is_valid() {
        let chain = make_chain();
        assert!(ChainVerifier::new().verify(&chain[..1]).valid);
    }
}
