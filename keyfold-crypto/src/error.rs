//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while locking, unlocking or wrapping key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption version '{0}' is already registered")]
    DuplicateVersion(String),

    #[error("unknown encryption version '{0}'")]
    UnknownAlgorithmVersion(String),

    #[error("algorithm mismatch: key is '{key}' but the box was locked with '{found}'")]
    AlgorithmMismatch { key: String, found: String },

    #[error("this key is encrypted and can not be used directly to {0}")]
    NotDirectlyUsable(&'static str),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
