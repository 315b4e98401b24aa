//! Authenticated symmetric encryption.
//!
//! Both ciphers produce a single self-contained blob: the random nonce is
//! prepended to the AEAD output (ciphertext followed by the Poly1305 tag).

use crate::error::{CryptoError, CryptoResult};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce, XChaCha20Poly1305, XNonce};
use rand::RngCore;

/// Size of every symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// XChaCha20-Poly1305 nonce size in bytes.
pub const XNONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Generates a random symmetric key.
pub fn generate_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut key);
    key
}

fn check_key(key: &[u8]) -> CryptoResult<()> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    Ok(())
}

/// Encrypts `plaintext` with ChaCha20-Poly1305 under a 32-byte key.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(key)?;
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("chacha20poly1305: {e}")))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a blob produced by [`encrypt`].
pub fn decrypt(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(key)?;
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption("ciphertext too short".to_string()));
    }
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))
}

/// Encrypts `plaintext` with XChaCha20-Poly1305 under a 32-byte key.
pub fn xencrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(key)?;
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut nonce = [0u8; XNONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("xchacha20poly1305: {e}")))?;

    let mut out = Vec::with_capacity(XNONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a blob produced by [`xencrypt`].
pub fn xdecrypt(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(key)?;
    if data.len() < XNONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption("ciphertext too short".to_string()));
    }
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;

    let (nonce, ciphertext) = data.split_at(XNONCE_SIZE);
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))
}
