//! Error types for the Ledger.

use finchain_core::{BlockId, CoreError, TransactionId, UserId};
use finchain_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during Ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Block construction, mining or decryption error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The user has no chain.
    #[error("chain not found for user {0}")]
    ChainNotFound(UserId),

    /// The user already has a genesis block.
    #[error("chain already exists for user {0}")]
    ChainExists(UserId),

    /// The transaction is already recorded.
    #[error("transaction already recorded: {0}")]
    TransactionExists(TransactionId),

    /// Another block already occupies the position being written.
    #[error("conflict at user {user_id} index {index}: existing block {existing}")]
    Conflict {
        user_id: UserId,
        index: u64,
        existing: BlockId,
    },

    /// A decrypted payload does not match what the block commits to.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// A background mining task failed to complete.
    #[error("mining task failed: {0}")]
    Task(String),
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
