//! Receipts: user-facing attestations for ledger blocks.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::types::TransactionId;

/// Message reported when a transaction has no block.
pub const NOT_FOUND_MESSAGE: &str = "Transaction not found in blockchain";

/// Read-only projection of a block for display.
///
/// Always reports `verified: true`; it does not re-verify the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_id: Option<TransactionId>,
    pub block_hash: String,
    pub block_index: u64,
    pub timestamp: i64,
    pub data_hash: String,
    pub verified: bool,
}

impl TransactionReceipt {
    pub fn from_block(block: &Block) -> Self {
        Self {
            transaction_id: block.transaction_id.clone(),
            block_hash: block.hash.clone(),
            block_index: block.index,
            timestamp: block.timestamp,
            data_hash: block.data_hash.clone(),
            verified: true,
        }
    }
}

impl From<&Block> for TransactionReceipt {
    fn from(block: &Block) -> Self {
        Self::from_block(block)
    }
}

/// Result of looking a transaction up in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionVerification {
    pub verified: bool,
    pub receipt: Option<TransactionReceipt>,
    pub message: Option<String>,
}

/// Find the first block carrying `transaction_id` and produce its receipt.
pub fn find_by_transaction(
    transaction_id: &TransactionId,
    blocks: &[Block],
) -> TransactionVerification {
    match blocks
        .iter()
        .find(|b| b.transaction_id.as_ref() == Some(transaction_id))
    {
        Some(block) => TransactionVerification {
            verified: true,
            receipt: Some(TransactionReceipt::from_block(block)),
            message: None,
        },
        None => TransactionVerification {
            verified: false,
            receipt: None,
            message: Some(NOT_FOUND_MESSAGE.to_string()),
        },
    }
}
