//! Proof-of-work mining.
//!
//! The miner searches for the smallest nonce whose block hash starts with
//! `difficulty` `'0'` characters. The search is capped at `max_iterations`
//! attempts; running out is a configuration error, not a verification
//! failure.

use crate::block::{header_prefix, Block};
use crate::error::{CoreError, Result};
use crate::hasher::digest;

/// Default number of leading zero characters.
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Default attempt cap, far above the ~16^4 expected for difficulty 4.
pub const DEFAULT_MAX_ITERATIONS: u64 = 10_000_000;

/// Hex digest length; no hash can have more leading zeros than this.
pub const MAX_DIFFICULTY: usize = 64;

/// Bounded proof-of-work search.
#[derive(Debug, Clone)]
pub struct Miner {
    difficulty: usize,
    max_iterations: u64,
    target: String,
}

impl Miner {
    /// Create a miner. Rejects difficulties no digest can satisfy.
    pub fn new(difficulty: usize, max_iterations: u64) -> Result<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(CoreError::InvalidDifficulty {
                requested: difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        Ok(Self {
            difficulty,
            max_iterations,
            target: "0".repeat(difficulty),
        })
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn max_iterations(&self) -> u64 {
        self.max_iterations
    }

    /// Check whether a hash satisfies the difficulty.
    pub fn meets_difficulty(&self, hash: &str) -> bool {
        hash.starts_with(&self.target)
    }

    /// Mine `block` in place, setting `nonce` and `hash`, and return the hash.
    pub fn mine(&self, block: &mut Block) -> Result<String> {
        let prefix = header_prefix(block);

        let mut nonce = 0u64;
        for _ in 0..self.max_iterations {
            let hash = digest(&format!("{}{}", prefix, nonce));
            if self.meets_difficulty(&hash) {
                block.nonce = nonce;
                block.hash = hash.clone();
                return Ok(hash);
            }
            nonce += 1;
        }

        Err(CoreError::MiningExhausted {
            difficulty: self.difficulty,
            attempts: self.max_iterations,
        })
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            target: "0".repeat(DEFAULT_DIFFICULTY),
        }
    }
}
