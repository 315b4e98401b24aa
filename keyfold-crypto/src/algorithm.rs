//! Versioned algorithm implementations.
//!
//! Every implementation carries a short version tag (e.g. `S1`, `A1`) that is
//! stored next to everything it encrypts. The tag is how the registry finds the
//! right implementation to decrypt data written by older versions.

use crate::cipher::{self, KEY_SIZE};
use crate::envelope;
use crate::error::CryptoResult;
use zeroize::Zeroizing;

/// Tag of the ChaCha20-Poly1305 symmetric algorithm.
pub const CHACHA20_POLY1305_V1: &str = "S1";

/// Tag of the XChaCha20-Poly1305 symmetric algorithm.
pub const XCHACHA20_POLY1305_V2: &str = "S2";

/// Tag of the X25519 + XSalsa20-Poly1305 sealed box algorithm.
pub const X25519_SEALED_BOX_V1: &str = "A1";

/// A symmetric encryption algorithm.
pub trait SymmetricEncryption: Send + Sync {
    /// The version tag written into every box this algorithm locks.
    fn version(&self) -> &str;

    /// Generates fresh raw key material.
    fn generate_key(&self) -> Zeroizing<Vec<u8>>;

    fn encrypt(&self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>;

    fn decrypt(&self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Raw asymmetric key material as produced by [`AsymmetricEncryption::generate_key_pair`].
pub struct KeyPairBytes {
    pub private_key: Zeroizing<Vec<u8>>,
    pub public_key: Vec<u8>,
}

/// A public-key encryption algorithm.
pub trait AsymmetricEncryption: Send + Sync {
    fn version(&self) -> &str;

    fn generate_key_pair(&self) -> KeyPairBytes;

    /// Encrypts with the public key only.
    fn encrypt(&self, public_key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>;

    fn decrypt(&self, private_key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// ChaCha20-Poly1305 with a 96-bit random nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaCha20Poly1305V1;

impl SymmetricEncryption for ChaCha20Poly1305V1 {
    fn version(&self) -> &str {
        CHACHA20_POLY1305_V1
    }

    fn generate_key(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(cipher::generate_key().to_vec())
    }

    fn encrypt(&self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher::encrypt(key, data)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher::decrypt(key, data)
    }
}

/// XChaCha20-Poly1305 with a 192-bit random nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct XChaCha20Poly1305V2;

impl SymmetricEncryption for XChaCha20Poly1305V2 {
    fn version(&self) -> &str {
        XCHACHA20_POLY1305_V2
    }

    fn generate_key(&self) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; KEY_SIZE]);
        key.copy_from_slice(&cipher::generate_key());
        key
    }

    fn encrypt(&self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher::xencrypt(key, data)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher::xdecrypt(key, data)
    }
}

/// X25519 key agreement with an ephemeral sender key + XSalsa20-Poly1305.
#[derive(Debug, Default, Clone, Copy)]
pub struct X25519SealedBoxV1;

impl AsymmetricEncryption for X25519SealedBoxV1 {
    fn version(&self) -> &str {
        X25519_SEALED_BOX_V1
    }

    fn generate_key_pair(&self) -> KeyPairBytes {
        let kp = envelope::generate_keypair();
        KeyPairBytes {
            private_key: kp.secret,
            public_key: kp.public,
        }
    }

    fn encrypt(&self, public_key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        envelope::seal(data, public_key)
    }

    fn decrypt(&self, private_key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        envelope::open(data, private_key)
    }
}
