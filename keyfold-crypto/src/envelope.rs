//! Anonymous public-key envelopes.
//!
//! Uses X25519 key exchange + XSalsa20-Poly1305 to seal small secrets (wrapped
//! keys) for a recipient's public key. Each seal uses a fresh ephemeral keypair,
//! so the sender's identity is not revealed and equal inputs never produce equal
//! ciphertexts.
//!
//! Wire layout: `ephemeral_public_key (32) || nonce (24) || ciphertext || tag`.

use crate::error::{CryptoError, CryptoResult};
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;
use zeroize::Zeroizing;

/// X25519 public/secret key size in bytes.
pub const X25519_KEY_SIZE: usize = 32;

/// XSalsa20 nonce size in bytes.
pub const ENVELOPE_NONCE_SIZE: usize = 24;

/// Raw X25519 keypair bytes. The secret half is zeroized on drop.
pub struct EnvelopeKeyPair {
    pub secret: Zeroizing<Vec<u8>>,
    pub public: Vec<u8>,
}

/// Generates a new X25519 keypair.
pub fn generate_keypair() -> EnvelopeKeyPair {
    let mut bytes = Zeroizing::new([0u8; X25519_KEY_SIZE]);
    rand::rng().fill_bytes(&mut bytes[..]);
    let secret = SecretKey::from(*bytes);
    let public = secret.public_key();
    EnvelopeKeyPair {
        secret: Zeroizing::new(secret.to_bytes().to_vec()),
        public: public.as_bytes().to_vec(),
    }
}

fn to_array(bytes: &[u8]) -> CryptoResult<[u8; X25519_KEY_SIZE]> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: X25519_KEY_SIZE,
            actual: bytes.len(),
        })
}

/// Seals `data` for the holder of `recipient_public`.
pub fn seal(data: &[u8], recipient_public: &[u8]) -> CryptoResult<Vec<u8>> {
    let recipient_pk = PublicKey::from(to_array(recipient_public)?);

    let mut ephemeral_bytes = Zeroizing::new([0u8; X25519_KEY_SIZE]);
    rand::rng().fill_bytes(&mut ephemeral_bytes[..]);
    let ephemeral = SecretKey::from(*ephemeral_bytes);
    let ephemeral_pk = ephemeral.public_key();

    let salsa_box = SalsaBox::new(&recipient_pk, &ephemeral);

    let mut nonce_bytes = [0u8; ENVELOPE_NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = salsa_box
        .encrypt(crypto_box::Nonce::from_slice(&nonce_bytes), data)
        .map_err(|e| CryptoError::Encryption(format!("envelope seal failed: {e}")))?;

    let mut out = Vec::with_capacity(X25519_KEY_SIZE + ENVELOPE_NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(ephemeral_pk.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Opens an envelope produced by [`seal`] with the recipient's secret key.
pub fn open(envelope: &[u8], recipient_secret: &[u8]) -> CryptoResult<Vec<u8>> {
    if envelope.len() < X25519_KEY_SIZE + ENVELOPE_NONCE_SIZE {
        return Err(CryptoError::Decryption("envelope too short".to_string()));
    }
    let recipient_sk = SecretKey::from(to_array(recipient_secret)?);

    let (ephemeral, rest) = envelope.split_at(X25519_KEY_SIZE);
    let (nonce, ciphertext) = rest.split_at(ENVELOPE_NONCE_SIZE);
    let ephemeral_pk = PublicKey::from(to_array(ephemeral)?);

    let salsa_box = SalsaBox::new(&ephemeral_pk, &recipient_sk);
    salsa_box
        .decrypt(crypto_box::Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            CryptoError::Decryption(
                "envelope open failed (wrong key or tampered data)".to_string(),
            )
        })
}

/// Derives the public key belonging to a raw X25519 secret key.
pub fn public_from_secret(secret: &[u8]) -> CryptoResult<Vec<u8>> {
    let sk = SecretKey::from(to_array(secret)?);
    Ok(sk.public_key().as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let kp = generate_keypair();
        let sealed = seal(b"folder-key-material", &kp.public).unwrap();
        assert_eq!(open(&sealed, &kp.secret).unwrap(), b"folder-key-material");
    }

    #[test]
    fn wrong_recipient_fails() {
        let target = generate_keypair();
        let other = generate_keypair();
        let sealed = seal(b"secret", &target.public).unwrap();
        assert!(open(&sealed, &other.secret).is_err());
    }

    #[test]
    fn each_seal_differs() {
        let kp = generate_keypair();
        let a = seal(b"same", &kp.public).unwrap();
        let b = seal(b"same", &kp.public).unwrap();
        assert_ne!(a[..X25519_KEY_SIZE], b[..X25519_KEY_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn public_key_derivation_matches() {
        let kp = generate_keypair();
        assert_eq!(public_from_secret(&kp.secret).unwrap(), kp.public);
    }

    #[test]
    fn bad_public_key_length() {
        let err = seal(b"x", &[1u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyLength { .. }));
    }
}
