//! Symmetric key handling and authentication tags.

use crate::types::Tag;
use hmac::digest::Key;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 block size; HMAC keys are padded to this length.
const HMAC_BLOCK_LEN: usize = 64;

/// Length of the shared secret in bytes.
pub const SECRET_KEY_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key is not valid hex: {0}")]
    InvalidHex(String),

    #[error("Key must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Shared secret used by both issuers and verifiers.
///
/// Instances that must interoperate have to hold the same key material.
/// The bytes are wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl SecretKey {
    /// Generate a new random key from the OS CSPRNG.
    pub fn generate() -> Self {
        use rand::rngs::OsRng;
        let mut bytes = [0u8; SECRET_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded key. Surrounding whitespace is ignored.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let mut bytes = hex::decode(s.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        if bytes.len() != SECRET_KEY_LEN {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(KeyError::InvalidLength {
                expected: SECRET_KEY_LEN,
                actual,
            });
        }
        let mut key = [0u8; SECRET_KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Hex encoding of the raw key (for key files only).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short identifier for the key: first 8 bytes of SHA-256 over the key, hex encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..8])
    }

    /// Compute the HMAC-SHA256 tag of `message`.
    pub fn sign(&self, message: &[u8]) -> Tag {
        // HMAC zero-pads keys shorter than the hash block, so padding here
        // yields the same tag through the fixed-size constructor.
        let mut block = [0u8; HMAC_BLOCK_LEN];
        block[..SECRET_KEY_LEN].copy_from_slice(&self.0);
        let mut mac = <HmacSha256 as Mac>::new(Key::<HmacSha256>::from_slice(&block));
        block.zeroize();
        mac.update(message);
        Tag(mac.finalize().into_bytes().into())
    }

    /// Recompute the tag of `message` and compare it to `tag` in constant time.
    pub fn verify_tag(&self, message: &[u8], tag: &Tag) -> bool {
        let expected = self.sign(message);
        expected.0.ct_eq(&tag.0).into()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}
