//! The Ledger: per-user tamper-evident transaction chains.
//!
//! The Ledger brings together block construction, mining, storage and
//! verification behind one interface. Mining runs on tokio's blocking pool
//! and appends for a single user are serialized by a per-user lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use finchain_core::{
    now_millis, Block, BlockFactory, ChainReport, ChainVerifier, Hasher, Miner, TransactionId,
    TransactionReceipt, TransactionVerification, UserId,
};
use finchain_store::{InsertResult, Store, StoreExt};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Summary of a user's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub user_id: UserId,
    pub length: u64,
    pub head_hash: String,
    pub valid: bool,
}

/// The main Ledger struct.
///
/// Provides a unified API for:
/// - Opening per-user chains
/// - Recording transactions as mined blocks
/// - Verifying chains and individual transactions
/// - Decrypting payloads
/// - Purging users and transactions
pub struct Ledger<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Builds and mines blocks. Shared with blocking mining tasks.
    factory: Arc<BlockFactory>,
    /// Chain verification policy.
    verifier: ChainVerifier,
    /// One append lock per user.
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl<S: Store> Ledger<S> {
    /// Create a new ledger instance.
    pub fn new(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let hasher = Hasher::new(&config.encryption_key);
        let miner = Miner::new(config.difficulty, config.max_mining_iterations)?;
        let verifier = if config.verify_genesis {
            ChainVerifier::strict()
        } else {
            ChainVerifier::new()
        };

        tracing::debug!(
            difficulty = config.difficulty,
            max_mining_iterations = config.max_mining_iterations,
            verify_genesis = config.verify_genesis,
            "ledger created"
        );

        Ok(Self {
            store: Arc::new(store),
            factory: Arc::new(BlockFactory::new(hasher, miner)),
            verifier,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the block factory.
    pub fn factory(&self) -> &BlockFactory {
        &self.factory
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chain Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and persist the genesis block for a user.
    pub async fn open_chain(&self, user_id: &UserId) -> Result<Block> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if self.store.get_tail(user_id).await?.is_some() {
            return Err(LedgerError::ChainExists(user_id.clone()));
        }
        self.create_genesis(user_id).await
    }

    /// Record a transaction as the next block of the user's chain.
    ///
    /// Opens the chain first if the user has none.
    pub async fn record_transaction<T>(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
        payload: &T,
    ) -> Result<Block>
    where
        T: Serialize + ?Sized,
    {
        let serialized = serde_json::to_string(payload).map_err(finchain_core::CoreError::from)?;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if self.store.find_by_transaction(transaction_id).await?.is_some() {
            return Err(LedgerError::TransactionExists(transaction_id.clone()));
        }

        let previous = match self.store.get_tail(user_id).await? {
            Some(tail) => tail,
            None => self.create_genesis(user_id).await?,
        };

        let user = user_id.clone();
        let tx = transaction_id.clone();
        let block = self
            .mine(move |factory| {
                factory.create_block_from_json(&user, &tx, &serialized, &previous, now_millis())
            })
            .await?;

        self.persist(&block).await?;
        tracing::info!(
            user = %user_id,
            transaction = %transaction_id,
            index = block.index,
            nonce = block.nonce,
            "transaction recorded"
        );
        Ok(block)
    }

    /// Verify a user's chain.
    ///
    /// An unknown user has an empty chain, which verifies as valid.
    pub async fn verify_chain(&self, user_id: &UserId) -> Result<ChainReport> {
        let report = self.store.verify_user_chain(user_id, self.verifier).await?;
        if !report.valid {
            tracing::warn!(
                user = %user_id,
                block = ?report.invalid_block,
                message = %report.message,
                "chain verification failed"
            );
        }
        Ok(report)
    }

    /// Summarize a user's chain.
    pub async fn chain_stats(&self, user_id: &UserId) -> Result<ChainStats> {
        let chain = self.store.get_chain(user_id).await?;
        let head = chain
            .last()
            .ok_or_else(|| LedgerError::ChainNotFound(user_id.clone()))?;

        Ok(ChainStats {
            user_id: user_id.clone(),
            length: chain.len() as u64,
            head_hash: head.hash.clone(),
            valid: self.verifier.verify(&chain).valid,
        })
    }

    /// List all users that have a chain.
    pub async fn users(&self) -> Result<Vec<UserId>> {
        Ok(self.store.list_users().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Receipt for the block carrying a transaction, if any.
    pub async fn transaction_receipt(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionReceipt>> {
        let block = self.store.find_by_transaction(transaction_id).await?;
        Ok(block.as_ref().map(TransactionReceipt::from_block))
    }

    /// Look a transaction up in a user's chain.
    pub async fn verify_transaction(
        &self,
        user_id: &UserId,
        transaction_id: &TransactionId,
    ) -> Result<TransactionVerification> {
        Ok(self.store.lookup_transaction(user_id, transaction_id).await?)
    }

    /// Decrypt a block's payload back into JSON.
    ///
    /// The plaintext must digest to the block's `data_hash`.
    pub fn decrypt_payload(&self, block: &Block) -> Result<serde_json::Value> {
        let ciphertext = block.encrypted_data.as_deref().ok_or_else(|| {
            LedgerError::DataIntegrity(format!("block {} carries no payload", block.id))
        })?;

        let plaintext = self.factory.hasher().decrypt(ciphertext)?;
        if self.factory.hasher().digest(&plaintext) != block.data_hash {
            return Err(LedgerError::DataIntegrity(format!(
                "payload of block {} does not match its data hash",
                block.id
            )));
        }

        serde_json::from_str(&plaintext).map_err(|e| {
            LedgerError::DataIntegrity(format!("payload of block {} is not JSON: {}", block.id, e))
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Purge Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete a user's whole chain. Returns the number of blocks removed.
    pub async fn purge_user(&self, user_id: &UserId) -> Result<usize> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let removed = self.store.delete_user_chain(user_id).await?;
        self.release_user_lock(user_id, &lock);
        tracing::info!(user = %user_id, removed, "user chain purged");
        Ok(removed)
    }

    /// Delete the block carrying a transaction.
    ///
    /// Removing a block in the middle of a chain breaks its linkage; later
    /// verification reports it.
    pub async fn purge_transaction(&self, transaction_id: &TransactionId) -> Result<bool> {
        let removed = self.store.delete_transaction_block(transaction_id).await?;
        if removed {
            tracing::info!(transaction = %transaction_id, "transaction block purged");
        }
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn user_lock(&self, user_id: &UserId) -> Arc<AsyncMutex<()>> {
        // The map only caches lock handles, so a poisoned guard is still usable.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user_id.clone()).or_default())
    }

    /// Drop the cached lock of a purged user unless another task holds a handle.
    fn release_user_lock(&self, user_id: &UserId, lock: &Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller.
        if Arc::strong_count(lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Mine a genesis block and persist it. Caller holds the user lock.
    async fn create_genesis(&self, user_id: &UserId) -> Result<Block> {
        let user = user_id.clone();
        let genesis = self
            .mine(move |factory| factory.create_genesis(&user))
            .await?;

        self.persist(&genesis).await?;
        tracing::info!(user = %user_id, hash = %genesis.hash, "chain opened");
        Ok(genesis)
    }

    /// Run a mining closure on the blocking pool.
    async fn mine<F>(&self, build: F) -> Result<Block>
    where
        F: FnOnce(&BlockFactory) -> finchain_core::Result<Block> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let block = tokio::task::spawn_blocking(move || build(&factory))
            .await
            .map_err(|e| LedgerError::Task(e.to_string()))??;

        tracing::debug!(
            block = %block.id,
            index = block.index,
            nonce = block.nonce,
            difficulty = self.factory.miner().difficulty(),
            "block mined"
        );
        Ok(block)
    }

    async fn persist(&self, block: &Block) -> Result<()> {
        match self.store.insert_block(block).await? {
            InsertResult::Inserted | InsertResult::AlreadyExists => Ok(()),
            InsertResult::Conflict { existing } => Err(LedgerError::Conflict {
                user_id: block.user_id.clone(),
                index: block.index,
                existing,
            }),
            InsertResult::DuplicateTransaction { existing } => match &block.transaction_id {
                Some(transaction_id) => Err(LedgerError::TransactionExists(transaction_id.clone())),
                None => Err(LedgerError::Conflict {
                    user_id: block.user_id.clone(),
                    index: block.index,
                    existing,
                }),
            },
        }
    }
}
