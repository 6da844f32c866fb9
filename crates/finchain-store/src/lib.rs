//! # finchain Store
//!
//! Storage abstraction for finchain. Provides a trait-based interface for
//! block persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts block rows behind the [`Store`] trait, allowing
//! the ledger to be storage-agnostic. The primary implementation is
//! [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a block
//!
//! ## Usage
//!
//! ```rust,no_run
//! use finchain_store::{SqliteStore, Store};
//! use finchain_core::UserId;
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let chain = store.get_chain(&UserId::from("u1")).await.unwrap();
//!     println!("{} blocks", chain.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same block twice returns `AlreadyExists`
//! - **Position conflicts**: A different block at the same `(user_id, index)`
//!   returns `Conflict`
//! - **One block per transaction**: A second block for the same transaction
//!   returns `DuplicateTransaction`
//! - **Durable append**: A block is committed once `insert_block` returns `Inserted`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store, StoreExt};
