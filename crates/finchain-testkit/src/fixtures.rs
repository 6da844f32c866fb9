//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use serde::{Deserialize, Serialize};

use finchain::{Ledger, LedgerConfig};
use finchain_core::{
    Block, BlockFactory, EncryptionSecret, Hasher, Miner, TransactionId, UserId,
    DEFAULT_MAX_ITERATIONS,
};
use finchain_store::MemoryStore;

/// Secret shared by every fixture.
pub const TEST_SECRET: &str = "finchain-testkit-secret";

/// A typical transaction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub date: String,
}

/// Deterministic sample payload; even positions are debits, odd are credits.
pub fn sample_payload(n: u64) -> TransactionPayload {
    TransactionPayload {
        amount: 100 + (n as i64 % 50) * 25,
        kind: if n % 2 == 0 { "debit" } else { "credit" }.to_string(),
        category: ["groceries", "rent", "salary", "transport"][(n % 4) as usize].to_string(),
        date: format!("2025-01-{:02}", n % 28 + 1),
    }
}

/// A test fixture with a block factory for one user.
pub struct TestFixture {
    pub user: UserId,
    pub difficulty: usize,
    pub factory: BlockFactory,
}

impl TestFixture {
    /// Create a fixture for `user` at difficulty 1.
    pub fn new(user: &str) -> Self {
        Self::with_difficulty(user, 1)
    }

    /// Create a fixture mining at the given difficulty.
    ///
    /// Panics if `difficulty` exceeds the digest length.
    pub fn with_difficulty(user: &str, difficulty: usize) -> Self {
        let miner = Miner::new(difficulty, DEFAULT_MAX_ITERATIONS).expect("valid difficulty");
        Self {
            user: UserId::from(user),
            difficulty,
            factory: BlockFactory::new(Hasher::new(&EncryptionSecret::new(TEST_SECRET)), miner),
        }
    }

    /// Ledger configuration matching this fixture's factory.
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig::new(TEST_SECRET).with_difficulty(self.difficulty)
    }

    /// A fresh in-memory ledger with this fixture's configuration.
    pub fn memory_ledger(&self) -> Ledger<MemoryStore> {
        Ledger::new(MemoryStore::new(), self.config()).expect("valid fixture config")
    }

    /// Mine a genesis block.
    pub fn make_genesis(&self) -> Block {
        self.factory
            .create_genesis(&self.user)
            .expect("genesis mines")
    }

    /// Mine the successor of `previous` for transaction `tx`.
    pub fn make_block(&self, tx: &str, payload: &TransactionPayload, previous: &Block) -> Block {
        self.factory
            .create_block(&self.user, &TransactionId::from(tx), payload, previous)
            .expect("block mines")
    }

    /// Mine a chain of genesis plus `transactions` blocks with sample payloads.
    ///
    /// Transaction ids are `"{user}-tx-{n}"`, so chains of different users
    /// never share a transaction.
    pub fn make_chain(&self, transactions: u64) -> Vec<Block> {
        let mut chain = vec![self.make_genesis()];
        for n in 1..=transactions {
            let tx = format!("{}-tx-{}", self.user, n);
            let block = self.make_block(&tx, &sample_payload(n), &chain[chain.len() - 1]);
            chain.push(block);
        }
        chain
    }
}

/// Create fixtures for several distinct users.
pub fn multi_user_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::new(&format!("user-{}", i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finchain_core::ChainVerifier;
    use finchain_store::Store;

    #[test]
    fn test_fixture_chain_is_valid() {
        let fixture = TestFixture::new("alice");
        let chain = fixture.make_chain(5);

        assert_eq!(chain.len(), 6);
        assert!(ChainVerifier::strict().verify(&chain).valid);
    }

    #[test]
    fn test_sample_payload_shape() {
        let value = serde_json::to_value(sample_payload(3)).unwrap();
        assert_eq!(value["type"], "credit");
        assert!(value["amount"].is_i64());
    }

    #[tokio::test]
    async fn test_fixture_ledger_reads_fixture_blocks() {
        let fixture = TestFixture::new("alice");
        let ledger = fixture.memory_ledger();
        let chain = fixture.make_chain(2);
        for block in &chain {
            ledger.store().insert_block(block).await.unwrap();
        }

        let payload = ledger.decrypt_payload(&chain[2]).unwrap();
        assert_eq!(payload, serde_json::to_value(sample_payload(2)).unwrap());
        assert!(ledger.verify_chain(&fixture.user).await.unwrap().valid);
    }

    #[test]
    fn test_multi_user_fixtures_are_distinct() {
        let fixtures = multi_user_fixtures(3);
        assert_eq!(fixtures[0].user, UserId::from("user-0"));
        assert_ne!(fixtures[1].user, fixtures[2].user);
    }
}
