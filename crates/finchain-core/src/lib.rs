//! # finchain Core
//!
//! Pure primitives for the finchain ledger: blocks, proof-of-work mining,
//! chain verification, and transaction receipts.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over hash-chained blocks.
//!
//! ## Key Types
//!
//! - [`Block`] - One immutable record in a per-user hash chain
//! - [`BlockFactory`] - Builds genesis and successor blocks
//! - [`Miner`] - Bounded proof-of-work search
//! - [`ChainVerifier`] - End-to-end chain integrity check
//! - [`TransactionReceipt`] - User-facing attestation for a block
//!
//! ## Hashing
//!
//! Digests are BLAKE3 rendered as lowercase hex. Payloads are encrypted with
//! ChaCha20-Poly1305 under a key derived from the deployment secret. See
//! [`hasher`].

pub mod block;
pub mod error;
pub mod hasher;
pub mod miner;
pub mod receipt;
pub mod types;
pub mod verify;

pub use block::{compute_block_hash, Block, BlockFactory, GENESIS_MARKER, GENESIS_PREVIOUS_HASH};
pub use error::{CoreError, Result};
pub use hasher::{digest, EncryptionSecret, Hasher};
pub use miner::{Miner, DEFAULT_DIFFICULTY, DEFAULT_MAX_ITERATIONS, MAX_DIFFICULTY};
pub use receipt::{
    find_by_transaction, TransactionReceipt, TransactionVerification, NOT_FOUND_MESSAGE,
};
pub use types::{now_millis, BlockId, TransactionId, UserId};
pub use verify::{ChainReport, ChainVerifier};
