//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for finchain. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use finchain_core::{now_millis, Block, BlockId, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

const BLOCK_COLUMNS: &str = "id, user_id, transaction_id, idx, timestamp, data_hash, \
                             encrypted_data, previous_hash, nonce, hash";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and parent directories) and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::info!(path = %path.display(), "opened block store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// Helper to convert a row to Block
fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    let id_hex: String = row.get("id")?;
    let id = BlockId::from_hex(&id_hex)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    let index: i64 = row.get("idx")?;
    let nonce: i64 = row.get("nonce")?;

    Ok(Block {
        id,
        user_id: UserId::new(row.get::<_, String>("user_id")?),
        transaction_id: row
            .get::<_, Option<String>>("transaction_id")?
            .map(TransactionId::new),
        index: u64::try_from(index).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, index))?,
        timestamp: row.get("timestamp")?,
        data_hash: row.get("data_hash")?,
        encrypted_data: row.get("encrypted_data")?,
        previous_hash: row.get("previous_hash")?,
        nonce: u64::try_from(nonce).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(8, nonce))?,
        hash: row.get("hash")?,
    })
}

fn to_sql_int(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{} {} exceeds SQLite integer range", field, value)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_block(&self, block: &Block) -> Result<InsertResult> {
        let block = block.clone();

        self.run(move |conn| {
            let id_hex = block.id.to_hex();
            let index = to_sql_int(block.index, "index")?;
            let nonce = to_sql_int(block.nonce, "nonce")?;

            let tx = conn.transaction()?;

            let existing_by_id: Option<String> = tx
                .query_row("SELECT id FROM blocks WHERE id = ?1", params![id_hex], |row| {
                    row.get(0)
                })
                .optional()?;
            if existing_by_id.is_some() {
                return Ok(InsertResult::AlreadyExists);
            }

            let existing_at_pos: Option<String> = tx
                .query_row(
                    "SELECT id FROM blocks WHERE user_id = ?1 AND idx = ?2",
                    params![block.user_id.as_str(), index],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing) = existing_at_pos {
                let existing = BlockId::from_hex(&existing)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                return Ok(InsertResult::Conflict { existing });
            }

            if let Some(transaction_id) = &block.transaction_id {
                let existing_tx: Option<String> = tx
                    .query_row(
                        "SELECT id FROM blocks WHERE transaction_id = ?1",
                        params![transaction_id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(existing) = existing_tx {
                    let existing = BlockId::from_hex(&existing)
                        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                    return Ok(InsertResult::DuplicateTransaction { existing });
                }
            }

            tx.execute(
                "INSERT INTO blocks (
                    id, user_id, transaction_id, idx, timestamp, data_hash,
                    encrypted_data, previous_hash, nonce, hash, inserted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id_hex,
                    block.user_id.as_str(),
                    block.transaction_id.as_ref().map(|t| t.as_str()),
                    index,
                    block.timestamp,
                    block.data_hash,
                    block.encrypted_data,
                    block.previous_hash,
                    nonce,
                    block.hash,
                    now_millis(),
                ],
            )?;
            tx.commit()?;

            tracing::debug!(block = %block.id, user = %block.user_id, index = block.index, "inserted block");
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>> {
        let id_hex = id.to_hex();

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM blocks WHERE id = ?1", BLOCK_COLUMNS),
                params![id_hex],
                row_to_block,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_by_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Block>> {
        let transaction_id = transaction_id.clone();

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM blocks WHERE transaction_id = ?1", BLOCK_COLUMNS),
                params![transaction_id.as_str()],
                row_to_block,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_chain(&self, user_id: &UserId) -> Result<Vec<Block>> {
        let user_id = user_id.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM blocks WHERE user_id = ?1 ORDER BY idx",
                BLOCK_COLUMNS
            ))?;
            let blocks = stmt
                .query_map(params![user_id.as_str()], row_to_block)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(blocks)
        })
        .await
    }

    async fn get_tail(&self, user_id: &UserId) -> Result<Option<Block>> {
        let user_id = user_id.clone();

        self.run(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM blocks WHERE user_id = ?1 ORDER BY idx DESC LIMIT 1",
                    BLOCK_COLUMNS
                ),
                params![user_id.as_str()],
                row_to_block,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn chain_length(&self, user_id: &UserId) -> Result<u64> {
        let user_id = user_id.clone();

        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM blocks WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<UserId>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM blocks ORDER BY user_id")?;
            let users = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .map(|r| r.map(UserId::new))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
    }

    async fn delete_user_chain(&self, user_id: &UserId) -> Result<usize> {
        let user_id = user_id.clone();

        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM blocks WHERE user_id = ?1",
                params![user_id.as_str()],
            )?;
            tracing::info!(user = %user_id, removed, "deleted user chain");
            Ok(removed)
        })
        .await
    }

    async fn delete_transaction_block(&self, transaction_id: &TransactionId) -> Result<bool> {
        let transaction_id = transaction_id.clone();

        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM blocks WHERE transaction_id = ?1",
                params![transaction_id.as_str()],
            )?;
            Ok(removed > 0)
        })
        .await
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
                .create_block(
                    &user,
                    &TransactionId::from(*tx),
                    &json!({"amount": 500, "type": "debit", "tx": tx}),
                    &prev,
                )
                .unwrap();
            chain.push(block);
        }
        chain
    }

    #[tokio::test]
    async fn test_insert_and_get_block() {
        let store = SqliteStore::open_memory().unwrap();
        let chain = make_chain(&make_factory(), "u1", &["t1"]);

        for block in &chain {
            let result = store.insert_block(block).await.unwrap();
            assert_eq!(result, InsertResult::Inserted);
        }

        // All fields round-trip, including the nullable ones.
        let genesis = store.get_block(&chain[0].id).await.unwrap().unwrap();
        assert_eq!(genesis, chain[0]);
        let block = store.get_block(&chain[1].id).await.unwrap().unwrap();
        assert_eq!(block, chain[1]);
    }

    #[tokio::test]
    async fn test_idempotent_insert() {
        let store = SqliteStore::open_memory().unwrap();
        let chain = make_chain(&make_factory(), "u1", &[]);

        let r1 = store.insert_block(&chain[0]).await.unwrap();
        assert_eq!(r1, InsertResult::Inserted);

        let r2 = store.insert_block(&chain[0]).await.unwrap();
        assert_eq!(r2, InsertResult::AlreadyExists);
    }

    #[tokio::test]
    async fn test_conflict_detection() {
        let store = SqliteStore::open_memory().unwrap();
        let factory = make_factory();
        let first = make_chain(&factory, "u1", &[]);
        let second = make_chain(&factory, "u1", &[]);

        store.insert_block(&first[0]).await.unwrap();

        let result = store.insert_block(&second[0]).await.unwrap();
        assert!(matches!(result, InsertResult::Conflict { existing } if existing == first[0].id));
    }

    #[tokio::test]
    async fn test_duplicate_transaction() {
        let store = SqliteStore::open_memory().unwrap();
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
    async fn test_chain_ordering_and_tail() {
        let store = SqliteStore::open_memory().unwrap();
        let chain = make_chain(&make_factory(), "u1", &["t1", "t2", "t3"]);

        // Insert out of order; reads come back ordered by index.
        for block in chain.iter().rev() {
            store.insert_block(block).await.unwrap();
        }

        let user = UserId::from("u1");
        assert_eq!(store.get_chain(&user).await.unwrap(), chain);
        assert_eq!(store.get_tail(&user).await.unwrap().unwrap(), chain[3]);
        assert_eq!(store.chain_length(&user).await.unwrap(), 4);
        assert!(store.get_tail(&UserId::from("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_transaction() {
        let store = SqliteStore::open_memory().unwrap();
        let chain = make_chain(&make_factory(), "u1", &["t1", "t2"]);
        for block in &chain {
            store.insert_block(block).await.unwrap();
        }

        let found = store
            .find_by_transaction(&TransactionId::from("t2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, chain[2].id);
        assert!(store
            .find_by_transaction(&TransactionId::from("t9"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_purge() {
        let store = SqliteStore::open_memory().unwrap();
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
        assert!(!store
            .delete_transaction_block(&TransactionId::from("t3"))
            .await
            .unwrap());

        assert_eq!(store.delete_user_chain(&UserId::from("u1")).await.unwrap(), 3);
        assert_eq!(store.list_users().await.unwrap(), vec![UserId::from("u2")]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let chain = make_chain(&make_factory(), "u1", &["t1"]);

        {
            let store = SqliteStore::open(&path).unwrap();
            for block in &chain {
                store.insert_block(block).await.unwrap();
            }
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get_chain(&UserId::from("u1")).await.unwrap(), chain);
    }
}
