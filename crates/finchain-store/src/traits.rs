//! Store trait: the abstract interface for block persistence.
//!
//! This trait allows the ledger to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use finchain_core::{
    find_by_transaction, Block, BlockId, ChainReport, ChainVerifier, TransactionId,
    TransactionVerification, UserId,
};

use crate::error::Result;

/// Result of inserting a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Block was inserted successfully.
    Inserted,
    /// Block already exists (idempotent - not an error).
    AlreadyExists,
    /// A different block already occupies this `(user_id, index)`.
    Conflict {
        /// The block at this position.
        existing: BlockId,
    },
    /// The transaction is already recorded in another block.
    DuplicateTransaction {
        /// The block carrying the transaction.
        existing: BlockId,
    },
}

/// The Store trait: async interface for block persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// Blocks are rows: the store never re-hashes, re-mines or verifies them.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Block Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a mined block.
    ///
    /// # Returns
    /// - `Inserted` if the block was new.
    /// - `AlreadyExists` if a block with the same id is stored.
    /// - `Conflict` if another block occupies the same chain position.
    /// - `DuplicateTransaction` if the transaction already has a block.
    async fn insert_block(&self, block: &Block) -> Result<InsertResult>;

    /// Get a block by id.
    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>>;

    /// Find the block carrying a transaction.
    async fn find_by_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Block>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Chain Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a user's full chain ordered by index.
    async fn get_chain(&self, user_id: &UserId) -> Result<Vec<Block>>;

    /// Get the block with the highest index in a user's chain.
    async fn get_tail(&self, user_id: &UserId) -> Result<Option<Block>>;

    /// Number of blocks in a user's chain.
    async fn chain_length(&self, user_id: &UserId) -> Result<u64>;

    /// List all users that own at least one block.
    async fn list_users(&self) -> Result<Vec<UserId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Purge Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete every block of a user. Returns the number of rows removed.
    async fn delete_user_chain(&self, user_id: &UserId) -> Result<usize>;

    /// Delete the block carrying a transaction. Returns whether a row was removed.
    async fn delete_transaction_block(&self, transaction_id: &TransactionId) -> Result<bool>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Load a user's chain and verify it.
    fn verify_user_chain(
        &self,
        user_id: &UserId,
        verifier: ChainVerifier,
    ) -> impl std::future::Future<Output = Result<ChainReport>> + Send;

    /// Load a user's chain and look a transaction up in it.
    fn lookup_transaction(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
    ) -> impl std::future::Future<Output = Result<TransactionVerification>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn verify_user_chain(
        &self,
        user_id: &UserId,
        verifier: ChainVerifier,
    ) -> Result<ChainReport> {
        let chain = self.get_chain(user_id).await?;
        Ok(verifier.verify(&chain))
    }

    async fn lookup_transaction(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
    ) -> Result<TransactionVerification> {
        let chain = self.get_chain(user_id).await?;
        Ok(find_by_transaction(transaction_id, &chain))
    }
}
