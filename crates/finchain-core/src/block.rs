//! Block: one immutable record in a per-user hash chain.
//!
//! Blocks are created once (genesis at onboarding, a successor per ledger
//! transaction), mined immediately, then never mutated.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::hasher::{digest, Hasher};
use crate::miner::Miner;
use crate::types::{now_millis, BlockId, TransactionId, UserId};

/// Text whose digest becomes the genesis block's `data_hash`.
pub const GENESIS_MARKER: &str = "Genesis Block";

/// `previous_hash` of every genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A block in a user's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Opaque unique identifier.
    pub id: BlockId,

    /// Owner of the chain this block belongs to.
    pub user_id: UserId,

    /// External transaction reference (None only for genesis).
    pub transaction_id: Option<TransactionId>,

    /// Zero-based position in the chain.
    pub index: u64,

    /// Creation time (Unix milliseconds).
    pub timestamp: i64,

    /// Digest of the plaintext payload, or of [`GENESIS_MARKER`].
    pub data_hash: String,

    /// Encrypted payload (None for genesis).
    pub encrypted_data: Option<String>,

    /// Hash of the preceding block, [`GENESIS_PREVIOUS_HASH`] for genesis.
    pub previous_hash: String,

    /// Proof-of-work nonce.
    pub nonce: u64,

    /// Digest over (index, timestamp, data_hash, previous_hash, nonce).
    pub hash: String,
}

impl Block {
    /// Whether this block sits at position 0.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> String {
        compute_block_hash(self)
    }
}

/// Hash preimage without the nonce. Field order is fixed: index, timestamp,
/// data_hash, previous_hash, then the nonce appended by the caller.
pub(crate) fn header_prefix(block: &Block) -> String {
    format!(
        "{}{}{}{}",
        block.index, block.timestamp, block.data_hash, block.previous_hash
    )
}

/// Compute a block hash from its header fields.
pub fn compute_block_hash(block: &Block) -> String {
    digest(&format!("{}{}", header_prefix(block), block.nonce))
}

/// Builds genesis and successor blocks and mines them.
#[derive(Debug, Clone)]
pub struct BlockFactory {
    hasher: Hasher,
    miner: Miner,
}

impl BlockFactory {
    pub fn new(hasher: Hasher, miner: Miner) -> Self {
        Self { hasher, miner }
    }

    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    pub fn miner(&self) -> &Miner {
        &self.miner
    }

    /// Create and mine the genesis block for a user.
    pub fn create_genesis(&self, user_id: &UserId) -> Result<Block> {
        self.create_genesis_at(user_id, now_millis())
    }

    /// Create and mine a genesis block with an explicit timestamp.
    pub fn create_genesis_at(&self, user_id: &UserId, timestamp: i64) -> Result<Block> {
        let mut block = Block {
            id: BlockId::generate(),
            user_id: user_id.clone(),
            transaction_id: None,
            index: 0,
            timestamp,
            data_hash: self.hasher.digest(GENESIS_MARKER),
            encrypted_data: None,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            nonce: 0,
            hash: String::new(),
        };
        self.miner.mine(&mut block)?;
        Ok(block)
    }

    /// Create and mine the successor of `previous` carrying `payload`.
    pub fn create_block<T>(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
        payload: &T,
        previous: &Block,
    ) -> Result<Block>
    where
        T: Serialize + ?Sized,
    {
        self.create_block_at(user_id, transaction_id, payload, previous, now_millis())
    }

    /// Create and mine a successor block with an explicit timestamp.
    pub fn create_block_at<T>(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
        payload: &T,
        previous: &Block,
        timestamp: i64,
    ) -> Result<Block>
    where
        T: Serialize + ?Sized,
    {
        let serialized = serde_json::to_string(payload)?;
        self.create_block_from_json(user_id, transaction_id, &serialized, previous, timestamp)
    }

    /// Create and mine a successor from an already serialized JSON payload.
    ///
    /// `serialized` is hashed and encrypted verbatim.
    pub fn create_block_from_json(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
        serialized: &str,
        previous: &Block,
        timestamp: i64,
    ) -> Result<Block> {
        if previous.hash.is_empty() {
            return Err(CoreError::MalformedPredecessor(format!(
                "block {} has no hash",
                previous.id
            )));
        }
        if &previous.user_id != user_id {
            return Err(CoreError::MalformedPredecessor(format!(
                "block {} belongs to user {}, not {}",
                previous.id, previous.user_id, user_id
            )));
        }
        let index = previous.index.checked_add(1).ok_or_else(|| {
            CoreError::MalformedPredecessor(format!("block {} index overflow", previous.id))
        })?;

        let mut block = Block {
            id: BlockId::generate(),
            user_id: user_id.clone(),
            transaction_id: Some(transaction_id.clone()),
            index,
            timestamp,
            data_hash: self.hasher.digest(serialized),
            encrypted_data: Some(self.hasher.encrypt(serialized)?),
            previous_hash: previous.hash.clone(),
            nonce: 0,
            hash: String::new(),
        };
        self.miner.mine(&mut block)?;
        Ok(block)
    }
}
