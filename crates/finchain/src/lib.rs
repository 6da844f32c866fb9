//! # finchain
//!
//! Tamper-evident financial transaction ledgers built from per-user
//! proof-of-work hash chains.
//!
//! ## Overview
//!
//! Every user owns an independent chain. Each recorded transaction becomes a
//! block that:
//!
//! - **Commits** to its payload through a BLAKE3 digest (`data_hash`)
//! - **Encrypts** the payload with ChaCha20-Poly1305 under a derived key
//! - **Links** to its predecessor's hash (`previous_hash`)
//! - **Proves work** through a nonce whose hash has `difficulty` leading zeros
//!
//! Verification walks a chain and reports the first block whose link or
//! hash does not hold.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use finchain::{Ledger, LedgerConfig};
//! use finchain::core::{TransactionId, UserId};
//! use finchain::store::SqliteStore;
//!
//! async fn example() -> finchain::Result<()> {
//!     let config = LedgerConfig::from_env()?;
//!     let store = SqliteStore::open("ledger.db")?;
//!     let ledger = Ledger::new(store, config)?;
//!
//!     let user = UserId::from("u1");
//!     ledger
//!         .record_transaction(
//!             &user,
//!             &TransactionId::from("t1"),
//!             &serde_json::json!({"amount": 500, "type": "debit"}),
//!         )
//!         .await?;
//!
//!     let report = ledger.verify_chain(&user).await?;
//!     assert!(report.valid);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `finchain::core` - Blocks, hashing, mining, verification, receipts
//! - `finchain::store` - Storage abstraction, SQLite and in-memory backends

pub mod config;
pub mod error;
pub mod ledger;

// Re-export component crates
pub use finchain_core as core;
pub use finchain_store as store;

// Re-export main types for convenience
pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, Result};
pub use ledger::{ChainStats, Ledger};

// Re-export commonly used core types
pub use finchain_core::{
    Block, BlockId, ChainReport, ChainVerifier, TransactionId, TransactionReceipt,
    TransactionVerification, UserId,
};
