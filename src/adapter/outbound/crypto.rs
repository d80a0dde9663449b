//! AES-256-GCM encryption for stored provider API keys.
//!
//! Ciphertexts are stored as `iv:authTag:ciphertext`, each part standard
//! base64. The IV is 16 random bytes per encryption; the key is the 32-byte
//! UTF-8 value of `ENCRYPTION_KEY`.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use aes_gcm::aes::Aes256;
use aes_gcm::{AeadInPlace, AesGcm, KeyInit, Nonce, Tag};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CryptoError;
use crate::port::outbound::cipher::SecretCipher;

/// Environment variable holding the encryption key.
pub const KEY_ENV: &str = "ENCRYPTION_KEY";

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Encrypts and decrypts organization API keys.
#[derive(Clone)]
pub struct ApiKeyCipher {
    cipher: Aes256Gcm16,
}

impl ApiKeyCipher {
    /// Build a cipher from a 32-character key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] unless the key is exactly
    /// 32 bytes.
    pub fn new(key: &str) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength);
        }
        let cipher =
            Aes256Gcm16::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidKeyLength)?;
        Ok(Self { cipher })
    }

    /// Build a cipher from `ENCRYPTION_KEY`.
    pub fn from_env() -> Result<Self, CryptoError> {
        let key = std::env::var(KEY_ENV).map_err(|_| CryptoError::MissingKey)?;
        Self::new(&key)
    }
}

impl std::fmt::Debug for ApiKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyCipher").finish_non_exhaustive()
    }
}

fn decode(part: &str, name: &'static str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(part)
        .map_err(|_| CryptoError::InvalidEncoding { part: name })
}

impl SecretCipher for ApiKeyCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Err(CryptoError::EmptyPlaintext);
        }

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CryptoError::EncryptFailed)?;

        Ok(format!(
            "{}:{}:{}",
            STANDARD.encode(iv),
            STANDARD.encode(tag),
            STANDARD.encode(buffer)
        ))
    }

    fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        if encrypted.is_empty() {
            return Err(CryptoError::EmptyCiphertext);
        }

        let parts: Vec<&str> = encrypted.split(':').collect();
        let [iv, tag, ciphertext] = parts.as_slice() else {
            return Err(CryptoError::InvalidFormat);
        };

        let iv = decode(iv, "iv")?;
        let tag = decode(tag, "authTag")?;
        let mut buffer = decode(ciphertext, "ciphertext")?;
        if iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(CryptoError::InvalidFormat);
        }

        self.cipher
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| CryptoError::DecryptFailed)?;

        String::from_utf8(buffer).map_err(|_| CryptoError::DecryptFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn cipher() -> ApiKeyCipher {
        ApiKeyCipher::new(KEY).unwrap()
    }

    #[test]
    fn round_trip_restores_plaintext() {
        let c = cipher();
        for plaintext in ["sk-abc123", "sk-ünïcødé-✓", &"x".repeat(500)] {
            let encrypted = c.encrypt(plaintext).unwrap();
            assert_eq!(c.decrypt(&encrypted).unwrap(), plaintext);
        }
    }

    #[test]
    fn output_has_three_base64_parts() {
        let encrypted = cipher().encrypt("sk-test").unwrap();
        let parts: Vec<&str> = encrypted.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(STANDARD.decode(parts[0]).unwrap().len(), IV_LEN);
        assert_eq!(STANDARD.decode(parts[1]).unwrap().len(), TAG_LEN);
        assert_eq!(STANDARD.decode(parts[2]).unwrap().len(), "sk-test".len());
    }

    #[test]
    fn each_encryption_uses_a_fresh_iv() {
        let c = cipher();
        assert_ne!(c.encrypt("sk-same").unwrap(), c.encrypt("sk-same").unwrap());
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert_eq!(
            ApiKeyCipher::new("short").unwrap_err(),
            CryptoError::InvalidKeyLength
        );
        assert!(ApiKeyCipher::new(&format!("{KEY}x")).is_err());
    }

    #[test]
    fn rejects_empty_input() {
        let c = cipher();
        assert_eq!(c.encrypt("").unwrap_err(), CryptoError::EmptyPlaintext);
        assert_eq!(c.decrypt("").unwrap_err(), CryptoError::EmptyCiphertext);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let c = cipher();
        let encrypted = c.encrypt("sk-secret").unwrap();
        let parts: Vec<&str> = encrypted.split(':').collect();
        let mut body = STANDARD.decode(parts[2]).unwrap();
        body[0] ^= 0x01;
        let tampered = format!("{}:{}:{}", parts[0], parts[1], STANDARD.encode(body));
        assert_eq!(c.decrypt(&tampered).unwrap_err(), CryptoError::DecryptFailed);
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = cipher().encrypt("sk-secret").unwrap();
        let other = ApiKeyCipher::new("fedcba9876543210fedcba9876543210").unwrap();
        assert_eq!(other.decrypt(&encrypted).unwrap_err(), CryptoError::DecryptFailed);
    }

    #[test]
    fn malformed_triples_fail() {
        let c = cipher();
        let encrypted = c.encrypt("sk-secret").unwrap();
        let truncated = encrypted.rsplit_once(':').unwrap().0;
        assert_eq!(c.decrypt(truncated).unwrap_err(), CryptoError::InvalidFormat);
        assert_eq!(
            c.decrypt("a:b:c:d").unwrap_err(),
            CryptoError::InvalidFormat
        );
        assert_eq!(
            c.decrypt("!!!:AAAA:AAAA").unwrap_err(),
            CryptoError::InvalidEncoding { part: "iv" }
        );
    }
}
