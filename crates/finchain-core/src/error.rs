//! Error types for finchain Core.

use thiserror::Error;

/// Core errors that can occur while building, mining or decrypting blocks.
///
/// Chain verification failures are not errors; they are reported through
/// [`crate::ChainReport`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed predecessor block: {0}")]
    MalformedPredecessor(String),

    #[error("difficulty {requested} exceeds digest length {max}")]
    InvalidDifficulty { requested: usize, max: usize },

    #[error("mining exhausted after {attempts} attempts at difficulty {difficulty}")]
    MiningExhausted { difficulty: usize, attempts: u64 },

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
