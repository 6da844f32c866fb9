//! Hashing and payload encryption.
//!
//! Digests are BLAKE3 over UTF-8 text, rendered as 64 lowercase hex
//! characters. Payload encryption is ChaCha20-Poly1305 with a fresh random
//! nonce per call; the ciphertext text is `hex(nonce || ciphertext || tag)`.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use crate::error::{CoreError, Result};

const KEY_CONTEXT: &str = "finchain-v0-payload-encryption";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Compute the hex digest of a string.
pub fn digest(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// The deployment-wide encryption secret.
///
/// Never printed: `Debug` redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionSecret(String);

impl EncryptionSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionSecret(<redacted>)")
    }
}

impl From<&str> for EncryptionSecret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Digest function plus symmetric cipher bound to one secret.
#[derive(Clone)]
pub struct Hasher {
    key: [u8; 32],
}

impl Hasher {
    /// Derive the cipher key from the deployment secret.
    pub fn new(secret: &EncryptionSecret) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KEY_CONTEXT);
        hasher.update(secret.expose().as_bytes());
        Self {
            key: *hasher.finalize().as_bytes(),
        }
    }

    /// Hex digest of `input`.
    pub fn digest(&self, input: &str) -> String {
        digest(input)
    }

    /// Encrypt a plaintext payload.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| CoreError::Encryption(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CoreError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Decrypt ciphertext produced by [`Hasher::encrypt`].
    ///
    /// A wrong key or tampered ciphertext yields [`CoreError::Decryption`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let raw = hex::decode(ciphertext)
            .map_err(|e| CoreError::MalformedCiphertext(e.to_string()))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CoreError::MalformedCiphertext(format!(
                "expected at least {} bytes, got {}",
                NONCE_LEN + TAG_LEN,
                raw.len()
            )));
        }

        let (nonce, body) = raw.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| CoreError::Decryption(e.to_string()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| CoreError::Decryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CoreError::Decryption(e.to_string()))
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hasher(<key>)")
    }
}
