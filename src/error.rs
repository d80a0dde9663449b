use thiserror::Error;

use crate::domain::error::{DomainError, FieldErrors};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// API key encryption errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("ENCRYPTION_KEY environment variable is not set")]
    MissingKey,

    #[error("ENCRYPTION_KEY must be exactly 32 characters for AES-256-GCM")]
    InvalidKeyLength,

    #[error("cannot encrypt empty plaintext")]
    EmptyPlaintext,

    #[error("cannot decrypt empty string")]
    EmptyCiphertext,

    #[error("invalid encrypted format, expected iv:authTag:ciphertext")]
    InvalidFormat,

    #[error("invalid base64 in {part}")]
    InvalidEncoding { part: &'static str },

    #[error("decryption failed")]
    DecryptFailed,

    #[error("encryption failed")]
    EncryptFailed,
}

/// Errors raised by the hosted language model integration.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not configured for organization. Please configure it in Settings.")]
    MissingApiKey,

    #[error("model provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed stream event: {0}")]
    Stream(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_convert_into_validation() {
        let mut errors = FieldErrors::new();
        errors.add("_form", "Forecast not found");
        let err: Error = errors.into();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("Forecast not found"));
    }

    #[test]
    fn crypto_error_messages_are_stable() {
        assert_eq!(
            CryptoError::InvalidKeyLength.to_string(),
            "ENCRYPTION_KEY must be exactly 32 characters for AES-256-GCM"
        );
    }
}
