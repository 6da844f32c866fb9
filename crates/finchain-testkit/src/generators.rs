//! Proptest generators for property-based testing.

use proptest::prelude::*;

use finchain_core::{Block, BlockId, TransactionId, UserId};

use crate::fixtures::TransactionPayload;

/// Generate a random BlockId.
pub fn block_id() -> impl Strategy<Value = BlockId> {
    any::<[u8; 16]>().prop_map(BlockId::from_bytes)
}

/// Generate a user id.
pub fn user_id() -> impl Strategy<Value = UserId> {
    "[a-z][a-z0-9-]{0,15}".prop_map(UserId::new)
}

/// Generate a transaction id.
pub fn transaction_id() -> impl Strategy<Value = TransactionId> {
    "tx-[0-9a-f]{8}".prop_map(TransactionId::new)
}

/// Generate a reasonable timestamp (Unix ms).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64
}

/// Generate a transaction payload.
pub fn payload() -> impl Strategy<Value = TransactionPayload> {
    (
        -1_000_000i64..=1_000_000i64,
        prop_oneof![Just("debit"), Just("credit")],
        "[a-z]{3,12}",
        (2000u32..2100, 1u32..=12, 1u32..=28),
    )
        .prop_map(|(amount, kind, category, (y, m, d))| TransactionPayload {
            amount,
            kind: kind.to_string(),
            category,
            date: format!("{:04}-{:02}-{:02}", y, m, d),
        })
}

/// Arbitrary JSON payloads, including non-object values.
pub fn json_value() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        ".{0,16}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

/// A header field an attacker might rewrite in a stored block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TamperField {
    Nonce,
    DataHash,
    PreviousHash,
    Timestamp,
    Index,
}

impl TamperField {
    /// Whether tampering breaks the link check rather than the hash check.
    pub fn breaks_link(self) -> bool {
        matches!(self, TamperField::PreviousHash)
    }

    /// Rewrite this field of `block` without re-mining it.
    pub fn apply(self, block: &mut Block) {
        match self {
            TamperField::Nonce => block.nonce = block.nonce.wrapping_add(1),
            TamperField::DataHash => block.data_hash.push('0'),
            TamperField::PreviousHash => block.previous_hash.push('0'),
            TamperField::Timestamp => block.timestamp = block.timestamp.wrapping_add(1),
            TamperField::Index => block.index = block.index.wrapping_add(1),
        }
    }
}

impl Arbitrary for TamperField {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(TamperField::Nonce),
            Just(TamperField::DataHash),
            Just(TamperField::PreviousHash),
            Just(TamperField::Timestamp),
            Just(TamperField::Index),
        ]
        .boxed()
    }
}
