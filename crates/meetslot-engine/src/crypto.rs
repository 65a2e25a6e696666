//! Authenticated encryption for stored credentials.
//!
//! AES-256-GCM over a single string value. Each call seals the plaintext
//! under a fresh random 96-bit nonce and encodes the result as one
//! transportable blob: `base64(nonce || tag || ciphertext)`.
//!
//! Decryption fails closed: a flipped bit anywhere in the blob, a truncated
//! payload, or the wrong key all yield a [`CredentialCorrupted`] error
//! rather than garbage plaintext.
//!
//! The key is sourced from configuration; this module neither generates nor
//! rotates keys.
//!
//! [`CredentialCorrupted`]: crate::error::EngineErrorCode::CredentialCorrupted

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng as _;

use crate::error::{EngineError, EngineResult};

/// AES-256-GCM cipher for credential values.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Required key length in bytes.
    pub const KEY_LEN: usize = 32;

    /// GCM 96-bit nonce.
    const NONCE_LEN: usize = 12;

    /// GCM authentication tag.
    const TAG_LEN: usize = 16;

    /// Creates a cipher from a raw 32-byte key.
    pub fn new(key: &[u8]) -> EngineResult<Self> {
        if key.len() != Self::KEY_LEN {
            return Err(EngineError::configuration(format!(
                "cipher key must be exactly {} bytes, got {}",
                Self::KEY_LEN,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| EngineError::internal(format!("failed to initialize cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Encrypts a plaintext value into a `base64(nonce || tag || ciphertext)`
    /// blob, using a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> EngineResult<String> {
        let mut nonce = [0u8; Self::NONCE_LEN];
        rand::rng().fill(&mut nonce[..]);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| EngineError::internal("encryption failed"))?;

        let mut blob = Vec::with_capacity(Self::NONCE_LEN + Self::TAG_LEN + buffer.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&tag);
        blob.extend_from_slice(&buffer);
        Ok(BASE64.encode(blob))
    }

    /// Decrypts a blob produced by [`seal`](Self::seal).
    ///
    /// Fails closed with a `CredentialCorrupted` error if the blob is not
    /// valid base64, is too short to hold a nonce and tag, or the
    /// authentication tag does not verify.
    pub fn open(&self, blob: &str) -> EngineResult<String> {
        let raw = BASE64
            .decode(blob)
            .map_err(|_| EngineError::credential_corrupted("stored blob is not valid base64"))?;

        if raw.len() < Self::NONCE_LEN + Self::TAG_LEN {
            return Err(EngineError::credential_corrupted(
                "stored blob is too short to hold nonce and tag",
            ));
        }

        let (nonce, rest) = raw.split_at(Self::NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(Self::TAG_LEN);

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| {
                EngineError::credential_corrupted("authentication tag did not verify")
            })?;

        String::from_utf8(buffer)
            .map_err(|_| EngineError::credential_corrupted("decrypted value is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineErrorCode;
    use base64::Engine as _;

    fn cipher_with(byte: u8) -> SecretCipher {
        SecretCipher::new(&[byte; 32]).unwrap()
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = SecretCipher::new(&[0u8; 16]).unwrap_err();
        assert_eq!(err.code(), EngineErrorCode::ConfigurationError);
    }

    #[test]
    fn seal_open_round_trip() {
        let cipher = cipher_with(1);
        for plaintext in ["", "r", "1//refresh-token-value", "emoji ☕ and spaces"] {
            let blob = cipher.seal(plaintext).unwrap();
            assert_eq!(cipher.open(&blob).unwrap(), plaintext);
        }
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let cipher = cipher_with(1);
        let a = cipher.seal("same plaintext").unwrap();
        let b = cipher.seal("same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn single_bit_flips_fail_closed() {
        let cipher = cipher_with(1);
        let blob = cipher.seal("sensitive").unwrap();
        let raw = BASE64.decode(&blob).unwrap();

        // One flip in the nonce, one in the tag, one in the ciphertext.
        for index in [0, SecretCipher::NONCE_LEN, raw.len() - 1] {
            let mut tampered = raw.clone();
            tampered[index] ^= 0x01;
            let tampered_blob = BASE64.encode(&tampered);
            let err = cipher.open(&tampered_blob).unwrap_err();
            assert_eq!(err.code(), EngineErrorCode::CredentialCorrupted);
        }
    }

    #[test]
    fn wrong_key_fails_closed() {
        let blob = cipher_with(1).seal("sensitive").unwrap();
        let err = cipher_with(2).open(&blob).unwrap_err();
        assert_eq!(err.code(), EngineErrorCode::CredentialCorrupted);
    }

    #[test]
    fn truncated_blob_fails_closed() {
        let cipher = cipher_with(1);
        assert_eq!(
            cipher.open("AAAA").unwrap_err().code(),
            EngineErrorCode::CredentialCorrupted
        );
        assert_eq!(
            cipher.open("not base64!!!").unwrap_err().code(),
            EngineErrorCode::CredentialCorrupted
        );
    }
}
