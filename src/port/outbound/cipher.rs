//! Symmetric encryption of organization secrets at rest.

use crate::error::CryptoError;

/// Encrypts and decrypts short secrets such as provider API keys.
pub trait SecretCipher: Send + Sync {
    /// Encrypt `plaintext` into its storable text form.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Recover the plaintext from the stored text form.
    fn decrypt(&self, stored: &str) -> Result<String, CryptoError>;
}
