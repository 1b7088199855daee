//! # AES-128-GCM for General-Glo-Ciphering
//!
//! DLMS meters encrypt their push notifications with AES-128-GCM under a key
//! handed out by the grid operator. The nonce is derived from the envelope
//! (system title + frame counter), the associated data is empty and the
//! authentication tag trails the ciphertext.
//!
//! ```rust
//! use dlms_meter::dlms::crypto::{open, seal, AesKey};
//!
//! let key = AesKey::from_hex("000102030405060708090A0B0C0D0E0F").unwrap();
//! let nonce = [0u8; 12];
//! let sealed = seal(&key, &nonce, b"reading").unwrap();
//! assert_eq!(open(&key, &nonce, &sealed).unwrap(), b"reading");
//! ```

use crate::constants::{AES_KEY_LENGTH, DLMS_NONCE_LENGTH, GCM_TAG_LENGTH};
use crate::util::hex;
use aes_gcm::aead::{generic_array::GenericArray, Aead, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Cryptographic failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    #[error("Ciphertext of {length} bytes cannot hold a {tag}-byte authentication tag")]
    CiphertextTooShort { length: usize, tag: usize },

    #[error("Authentication failed: ciphertext or tag was tampered with, or the key is wrong")]
    AuthenticationFailed,

    #[error("Encryption failed")]
    EncryptionFailed,
}

/// AES-128 key provisioned by the caller.
///
/// The bytes are wiped on drop and never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey {
    key: [u8; AES_KEY_LENGTH],
}

impl AesKey {
    /// Create AES key from 16-byte slice
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != AES_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                actual: bytes.len(),
            });
        }

        let mut key = [0u8; AES_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Create AES key from a hex string (whitespace is ignored)
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode_hex(hex_str).map_err(|e| CryptoError::InvalidKey {
            reason: e.to_string(),
        })?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.key
    }

    fn cipher(&self) -> Aes128Gcm {
        Aes128Gcm::new(GenericArray::from_slice(&self.key))
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(<redacted>)")
    }
}

/// Authenticate and decrypt `ciphertext` (which ends with the tag).
///
/// No plaintext is returned unless the tag verifies.
pub fn open(
    key: &AesKey,
    nonce: &[u8; DLMS_NONCE_LENGTH],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < GCM_TAG_LENGTH {
        return Err(CryptoError::CiphertextTooShort {
            length: ciphertext.len(),
            tag: GCM_TAG_LENGTH,
        });
    }

    let payload = Payload {
        msg: ciphertext,
        aad: &[],
    };
    key.cipher()
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Encrypt `plaintext` and append the authentication tag.
pub fn seal(
    key: &AesKey,
    nonce: &[u8; DLMS_NONCE_LENGTH],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let payload = Payload {
        msg: plaintext,
        aad: &[],
    };
    key.cipher()
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| CryptoError::EncryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AesKey {
        AesKey::from_bytes(&[0x42; 16]).unwrap()
    }

    #[test]
    fn test_key_length_checked() {
        assert_eq!(
            AesKey::from_bytes(&[0u8; 15]),
            Err(CryptoError::InvalidKeyLength {
                expected: 16,
                actual: 15
            })
        );
        assert!(matches!(
            AesKey::from_hex("zz"),
            Err(CryptoError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let rendered = format!("{:?}", key());
        assert_eq!(rendered, "AesKey(<redacted>)");
        assert!(!rendered.contains("42"));
    }

    #[test]
    fn test_tag_is_appended() {
        let sealed = seal(&key(), &[1u8; 12], &[0u8; 10]).unwrap();
        assert_eq!(sealed.len(), 10 + GCM_TAG_LENGTH);
    }

    #[test]
    fn test_wrong_nonce_fails_authentication() {
        let sealed = seal(&key(), &[1u8; 12], b"230.1V").unwrap();
        assert_eq!(
            open(&key(), &[2u8; 12], &sealed),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_short_ciphertext_rejected() {
        assert!(matches!(
            open(&key(), &[0u8; 12], &[0u8; 8]),
            Err(CryptoError::CiphertextTooShort { length: 8, .. })
        ));
    }
}
