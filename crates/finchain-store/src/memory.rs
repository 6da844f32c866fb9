//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use finchain_core::{Block, BlockId, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Blocks indexed by id.
    blocks: HashMap<BlockId, Block>,

    /// Position index: user -> (index -> block id).
    chains: BTreeMap<UserId, BTreeMap<u64, BlockId>>,

    /// Transaction index.
    transactions: HashMap<TransactionId, BlockId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_block(&self, block: &Block) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.blocks.contains_key(&block.id) {
            return Ok(InsertResult::AlreadyExists);
        }

        if let Some(&existing) = inner
            .chains
            .get(&block.user_id)
            .and_then(|chain| chain.get(&block.index))
        {
            return Ok(InsertResult::Conflict { existing });
        }

        if let Some(tx) = &block.transaction_id {
            if let Some(&existing) = inner.transactions.get(tx) {
                return Ok(InsertResult::DuplicateTransaction { existing });
            }
            inner.transactions.insert(tx.clone(), block.id);
        }

        inner
            .chains
            .entry(block.user_id.clone())
            .or_default()
            .insert(block.index, block.id);
        inner.blocks.insert(block.id, block.clone());

        Ok(InsertResult::Inserted)
    }

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>> {
        let inner = self.read()?;
        Ok(inner.blocks.get(id).cloned())
    }

    async fn find_by_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Block>> {
        let inner = self.read()?;
        Ok(inner
            .transactions
            .get(transaction_id)
            .and_then(|id| inner.blocks.get(id))
            .cloned())
    }

    async fn get_chain(&self, user_id: &UserId) -> Result<Vec<Block>> {
        let inner = self.read()?;
        let Some(chain) = inner.chains.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(chain
            .values()
            .filter_map(|id| inner.blocks.get(id))
            .cloned()
            .collect())
    }

    async fn get_tail(&self, user_id: &UserId) -> Result<Option<Block>> {
        let inner = self.read()?;
        Ok(inner
            .chains
            .get(user_id)
            .and_then(|chain| chain.values().next_back())
            .and_then(|id| inner.blocks.get(id))
            .cloned())
    }

    async fn chain_length(&self, user_id: &UserId) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.chains.get(user_id).map_or(0, |c| c.len() as u64))
    }

    async fn list_users(&self) -> Result<Vec<UserId>> {
        let inner = self.read()?;
        Ok(inner
            .chains
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(user, _)| user.clone())
            .collect())
    }

    async fn delete_user_chain(&self, user_id: &UserId) -> Result<usize> {
        let mut inner = self.write()?;
        let Some(chain) = inner.chains.remove(user_id) else {
            return Ok(0);
        };

        for id in chain.values() {
            if let Some(block) = inner.blocks.remove(id) {
                if let Some(tx) = block.transaction_id {
                    inner.transactions.remove(&tx);
                }
            }
        }

        Ok(chain.len())
    }

    async fn delete_transaction_block(&self, transaction_id: &TransactionId) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(id) = inner.transactions.remove(transaction_id) else {
            return Ok(false);
        };

        if let Some(block) = inner.blocks.remove(&id) {
            if let Some(chain) = inner.chains.get_mut(&block.user_id) {
                chain.remove(&block.index);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finchain_core::{BlockFactory, EncryptionSecret, Hasher, Miner};
    use serde_json::json;

    fn make_factory() -> BlockFactory {
        BlockFactory::new(
            Hasher::new(&EncryptionSecret::new("test-key")),
            Miner::new(1, 100_000).unwrap(),
        )
    }

    fn make_chain(factory: &BlockFactory, user: &str, txs: &[&str]) -> Vec<Block> {
        let user = UserId::from(user);
        let mut chain = vec![factory.create_genesis(&user).unwrap()];
        for tx in txs {
            let prev = chain.last().unwrap().clone();
            let block = factory
                .create_block(&user, &TransactionId::from(*tx), &json!({"tx": tx}), &prev)
                .unwrap();
            chain.push(block);
        }
        chain
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let chain = make_chain(&make_factory(), "u1", &["t1"]);

        for block in &chain {
            assert_eq!(store.insert_block(block).await.unwrap(), InsertResult::Inserted);
        }

        let retrieved = store.get_block(&chain[1].id).await.unwrap().unwrap();
        assert_eq!(retrieved, chain[1]);
        assert_eq!(store.get_chain(&UserId::from("u1")).await.unwrap(), chain);
        assert_eq!(
            store.get_tail(&UserId::from("u1")).await.unwrap().unwrap().id,
            chain[1].id
        );
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemoryStore::new();
        let chain = make_chain(&make_factory(), "u1", &[]);

        let r1 = store.insert_block(&chain[0]).await.unwrap();
        assert_eq!(r1, InsertResult::Inserted);

        let r2 = store.insert_block(&chain[0]).await.unwrap();
        assert_eq!(r2, InsertResult::AlreadyExists);
    }

    #[tokio::test]
    async fn test_memory_store_position_conflict() {
        let store = MemoryStore::new();
        let factory = make_factory();
        let first = make_chain(&factory, "u1", &[]);
        let second = make_chain(&factory, "u1", &[]);

        store.insert_block(&first[0]).await.unwrap();
        let result = store.insert_block(&second[0]).await.unwrap();
        assert_eq!(
            result,
            InsertResult::Conflict {
                existing: first[0].id
            }
        );
    }

    #[tokio::test]
    async fn test_memory_store_duplicate_transaction() {
        let store = MemoryStore::new();
        let factory = make_factory();
        let a = make_chain(&factory, "u1", &["t1"]);
        let b = make_chain(&factory, "u2", &["t1"]);

        for block in a.iter().chain(b.iter().take(1)) {
            store.insert_block(block).await.unwrap();
        }
        let result = store.insert_block(&b[1]).await.unwrap();
        assert_eq!(result, InsertResult::DuplicateTransaction { existing: a[1].id });
    }

    #[tokio::test]
    async fn test_memory_store_purge() {
        let store = MemoryStore::new();
        let factory = make_factory();
        for block in make_chain(&factory, "u1", &["t1", "t2"])
            .iter()
            .chain(make_chain(&factory, "u2", &["t3"]).iter())
        {
            store.insert_block(block).await.unwrap();
        }

        assert!(store
            .delete_transaction_block(&TransactionId::from("t3"))
            .await
            .unwrap());
        assert_eq!(store.chain_length(&UserId::from("u2")).await.unwrap(), 1);

        assert_eq!(store.delete_user_chain(&UserId::from("u1")).await.unwrap(), 3);
        assert!(store
            .find_by_transaction(&TransactionId::from("t1"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.list_users().await.unwrap(), vec![UserId::from("u2")]);
    }
}
