//! Encryption layer for keyfold.
//!
//! Provides versioned, agile encryption primitives:
//! - ChaCha20-Poly1305 / XChaCha20-Poly1305 for symmetric encryption
//! - X25519 sealed boxes for wrapping keys to a public key
//! - Argon2id for key derivation from passwords
//!
//! # Architecture
//!
//! Every ciphertext is stored in a [`LockedBox`] tagged with the version of the
//! algorithm that produced it. An [`EncryptionRegistry`] maps tags to
//! implementations:
//!
//! 1. **New data** is always encrypted with the most recently registered
//!    algorithm of its family.
//!
//! 2. **Old data** stays readable as long as the algorithm named by its tag is
//!    still registered.
//!
//! Keys are a tagged union ([`Key`]). Raw keys lock and unlock; wrapped keys
//! are persisted and must be decrypted before use.

pub mod algorithm;
mod boxes;
pub mod cipher;
mod config;
pub mod envelope;
mod error;
pub mod kdf;
mod keys;
mod registry;

pub use algorithm::{
    AsymmetricEncryption, ChaCha20Poly1305V1, KeyPairBytes, SymmetricEncryption,
    X25519SealedBoxV1, XChaCha20Poly1305V2, CHACHA20_POLY1305_V1, X25519_SEALED_BOX_V1,
    XCHACHA20_POLY1305_V2,
};
pub use boxes::{LockedBox, OpenBox};
pub use config::CryptoConfig;
pub use error::{CryptoError, CryptoResult};
pub use kdf::{KdfParams, Salt, SALT_SIZE};
pub use keys::{AsymmetricKey, EncryptedAsymmetricKey, EncryptedSymmetricKey, Key, SymmetricKey};
pub use registry::{Algorithm, EncryptionRegistry};
