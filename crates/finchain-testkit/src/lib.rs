//! # finchain Testkit
//!
//! Testing utilities for finchain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Deterministic factories, sample payloads and pre-mined chains
//! - **Generators**: Proptest strategies for ids, payloads and tampering
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use finchain_core::ChainVerifier;
//! use finchain_testkit::{TamperField, TestFixture};
//!
//! proptest! {
//!     #[test]
//!     fn tampering_is_detected(field in any::<TamperField>()) {
//!         let mut chain = TestFixture::new("u1").make_chain(3);
//!         field.apply(&mut chain[2]);
//!         prop_assert!(!ChainVerifier::new().verify(&chain).valid);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use finchain_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new("alice");
//! let chain = fixture.make_chain(3);
//! assert_eq!(chain.len(), 4);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_user_fixtures, sample_payload, TestFixture, TransactionPayload};
pub use generators::TamperField;
