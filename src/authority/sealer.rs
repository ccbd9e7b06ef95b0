//! Payload sealing before data crosses into the authority.
//!
//! Sealing failure is never fatal: [`seal_or_passthrough`] logs a warning and
//! hands back the original bytes so a monitoring pass is never blocked on
//! encryption.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use tracing::warn;

use crate::core::errors::{Result, SentinelError};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Contract of the payload sealer.
pub trait PayloadSealer: Send + Sync {
    /// Encrypt `payload`; the output is opaque to the engine.
    fn seal(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Sealer that forwards payloads unchanged (sealing disabled).
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSealer;

impl PayloadSealer for PassthroughSealer {
    fn seal(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// AES-256-GCM sealer. Output layout: `nonce (12 bytes) || ciphertext+tag`.
pub struct AesGcmSealer {
    cipher: Aes256Gcm,
}

impl AesGcmSealer {
    /// Build from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(SentinelError::Seal {
                details: format!("key must be {KEY_LEN} bytes, got {}", key.len()),
            });
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self { cipher })
    }

    /// Build from a 64-character hex key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key = hex::decode(key_hex.trim()).map_err(|e| SentinelError::Seal {
            details: format!("key is not valid hex: {e}"),
        })?;
        Self::new(&key)
    }

    /// Generate a fresh random key, returned hex-encoded alongside the sealer.
    pub fn generate() -> (Self, String) {
        let key: [u8; KEY_LEN] = rand::random();
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        (Self { cipher }, hex::encode(key))
    }

    /// Reverse [`PayloadSealer::seal`]. Used by authority-side tooling and tests.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(SentinelError::Seal {
                details: format!("sealed payload shorter than nonce ({} bytes)", sealed.len()),
            });
        }
        let (nonce, body) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| SentinelError::Seal {
                details: "authentication failed".to_string(),
            })
    }
}

impl PayloadSealer for AesGcmSealer {
    fn seal(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let nonce: [u8; NONCE_LEN] = rand::random();
        let body = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), payload)
            .map_err(|_| SentinelError::Seal {
                details: "encryption failed".to_string(),
            })?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + body.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&body);
        Ok(sealed)
    }
}

/// Seal `payload`, degrading to the original bytes on failure.
pub fn seal_or_passthrough(sealer: &dyn PayloadSealer, payload: &[u8], entity: &str) -> Vec<u8> {
    match sealer.seal(payload) {
        Ok(sealed) => sealed,
        Err(err) => {
            warn!(
                entity,
                code = err.code(),
                error = %err,
                "payload sealing failed, forwarding unsealed payload"
            );
            payload.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSealer;

    impl PayloadSealer for BrokenSealer {
        fn seal(&self, _payload: &[u8]) -> Result<Vec<u8>> {
            Err(SentinelError::Seal {
                details: "hsm offline".to_string(),
            })
        }
    }

    #[test]
    fn sealed_payload_opens_to_original() {
        let (sealer, _key) = AesGcmSealer::generate();
        let sealed = sealer.seal(b"freeze token 0xabc").unwrap();
        assert_ne!(sealed.as_slice(), b"freeze token 0xabc");
        assert_eq!(sealer.open(&sealed).unwrap(), b"freeze token 0xabc");
    }

    #[test]
    fn nonces_differ_between_seals() {
        let (sealer, _key) = AesGcmSealer::generate();
        let a = sealer.seal(b"same").unwrap();
        let b = sealer.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hex_key_roundtrips_through_generate() {
        let (sealer, key_hex) = AesGcmSealer::generate();
        let reopened = AesGcmSealer::from_hex(&key_hex).unwrap();
        let sealed = sealer.seal(b"payload").unwrap();
        assert_eq!(reopened.open(&sealed).unwrap(), b"payload");
    }

    #[test]
    fn short_key_rejected() {
        let err = AesGcmSealer::new(&[0u8; 16]).err().unwrap();
        assert_eq!(err.code(), "SNT-2005");
        assert!(AesGcmSealer::from_hex("zz").is_err());
    }

    #[test]
    fn tampered_payload_fails_to_open() {
        let (sealer, _key) = AesGcmSealer::generate();
        let mut sealed = sealer.seal(b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(sealer.open(&sealed).is_err());
        assert!(sealer.open(&[1, 2, 3]).is_err());
    }

    #[test]
    fn failure_degrades_to_original_bytes() {
        let out = seal_or_passthrough(&BrokenSealer, b"raw", "node-1");
        assert_eq!(out, b"raw");
    }

    #[test]
    fn passthrough_is_identity() {
        assert_eq!(PassthroughSealer.seal(b"abc").unwrap(), b"abc");
    }
}
