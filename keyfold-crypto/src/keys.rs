//! Key value objects.
//!
//! Raw keys ([`SymmetricKey`], [`AsymmetricKey`]) live in memory only and can
//! lock and unlock boxes. Their wrapped forms ([`EncryptedSymmetricKey`],
//! [`EncryptedAsymmetricKey`]) are what gets persisted; they must be decrypted
//! back into a raw key before they can unlock anything.
//!
//! Every key carries an `origin`: the version tag of the algorithm it belongs
//! to. Boxes are tagged with the origin of the key that locked them, and a key
//! refuses to unlock a box carrying a different tag.

use crate::boxes::{LockedBox, OpenBox, base64_bytes};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{self, KdfParams, Salt};
use crate::registry::EncryptionRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

fn check_origin(key_origin: &str, locked: &LockedBox) -> CryptoResult<()> {
    if locked.key_origin != key_origin {
        return Err(CryptoError::AlgorithmMismatch {
            key: key_origin.to_string(),
            found: locked.key_origin.clone(),
        });
    }
    Ok(())
}

// ============================================================================
// Raw keys
// ============================================================================

/// A raw symmetric key.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    key: Zeroizing<Vec<u8>>,
    origin: String,
}

impl SymmetricKey {
    /// Generates a key for the highest registered symmetric algorithm.
    pub fn generate(registry: &EncryptionRegistry) -> CryptoResult<Self> {
        let algorithm = registry.get_highest_symmetric()?;
        Ok(Self {
            key: algorithm.generate_key(),
            origin: algorithm.version().to_string(),
        })
    }

    /// Wraps existing key bytes for the given algorithm version.
    pub fn from_bytes(key: impl Into<Vec<u8>>, origin: impl Into<String>) -> Self {
        Self {
            key: Zeroizing::new(key.into()),
            origin: origin.into(),
        }
    }

    /// Derives a key from a password for the highest symmetric algorithm.
    pub fn derive_from_password(
        password: &str,
        salt: &Salt,
        params: &KdfParams,
        registry: &EncryptionRegistry,
    ) -> CryptoResult<Self> {
        let algorithm = registry.get_highest_symmetric()?;
        Ok(Self {
            key: kdf::derive_key_bytes(password, salt, params)?,
            origin: algorithm.version().to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn lock(&self, open: &OpenBox, registry: &EncryptionRegistry) -> CryptoResult<LockedBox> {
        let algorithm = registry.get_symmetric(&self.origin)?;
        let enc_data = algorithm.encrypt(&self.key, open.as_bytes())?;
        Ok(LockedBox::new(enc_data, self.origin.clone()))
    }

    pub fn unlock(&self, locked: &LockedBox, registry: &EncryptionRegistry) -> CryptoResult<OpenBox> {
        check_origin(&self.origin, locked)?;
        let algorithm = registry.get_symmetric(&self.origin)?;
        Ok(OpenBox::new(algorithm.decrypt(&self.key, &locked.enc_data)?))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("origin", &self.origin)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A raw asymmetric key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct AsymmetricKey {
    private_key: Zeroizing<Vec<u8>>,
    public_key: Vec<u8>,
    origin: String,
}

impl AsymmetricKey {
    /// Generates a key pair for the highest registered asymmetric algorithm.
    pub fn generate(registry: &EncryptionRegistry) -> CryptoResult<Self> {
        let algorithm = registry.get_highest_asymmetric()?;
        let pair = algorithm.generate_key_pair();
        Ok(Self {
            private_key: pair.private_key,
            public_key: pair.public_key,
            origin: algorithm.version().to_string(),
        })
    }

    pub fn from_parts(
        private_key: impl Into<Vec<u8>>,
        public_key: Vec<u8>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            private_key: Zeroizing::new(private_key.into()),
            public_key,
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Locks with the public half.
    pub fn lock(&self, open: &OpenBox, registry: &EncryptionRegistry) -> CryptoResult<LockedBox> {
        lock_with_public(&self.public_key, &self.origin, open, registry)
    }

    pub fn unlock(&self, locked: &LockedBox, registry: &EncryptionRegistry) -> CryptoResult<OpenBox> {
        check_origin(&self.origin, locked)?;
        let algorithm = registry.get_asymmetric(&self.origin)?;
        Ok(OpenBox::new(
            algorithm.decrypt(&self.private_key, &locked.enc_data)?,
        ))
    }
}

impl fmt::Debug for AsymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricKey")
            .field("origin", &self.origin)
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

fn lock_with_public(
    public_key: &[u8],
    origin: &str,
    open: &OpenBox,
    registry: &EncryptionRegistry,
) -> CryptoResult<LockedBox> {
    let algorithm = registry.get_asymmetric(origin)?;
    let enc_data = algorithm.encrypt(public_key, open.as_bytes())?;
    Ok(LockedBox::new(enc_data, origin))
}

// ============================================================================
// Wrapped keys
// ============================================================================

/// A symmetric key wrapped under another key.
///
/// `origin` is the algorithm of the wrapped key itself; `enc_key.key_origin`
/// is the algorithm of the key that wrapped it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSymmetricKey {
    pub enc_key: LockedBox,
    pub origin: String,
}

impl EncryptedSymmetricKey {
    /// Wraps `original` under any lock-capable key.
    pub fn create(
        original: &SymmetricKey,
        wrap_with: &Key,
        registry: &EncryptionRegistry,
    ) -> CryptoResult<Self> {
        let enc_key = wrap_with.lock(&OpenBox::new(original.as_bytes().to_vec()), registry)?;
        Ok(Self {
            enc_key,
            origin: original.origin.clone(),
        })
    }

    /// Unwraps back into the raw key.
    pub fn decrypt(&self, unlock_with: &Key, registry: &EncryptionRegistry) -> CryptoResult<SymmetricKey> {
        let open = unlock_with.unlock(&self.enc_key, registry)?;
        Ok(SymmetricKey::from_bytes(open.as_bytes().to_vec(), self.origin.clone()))
    }

    /// Origin of the key this one is wrapped under.
    pub fn wrapped_by(&self) -> &str {
        &self.enc_key.key_origin
    }
}

/// An asymmetric key pair whose private half is wrapped.
///
/// The private key is locked under a fresh symmetric key, which is in turn
/// wrapped under the supplied key (`enc_key`). When the supplied key is itself
/// symmetric the private key is locked under it directly and `enc_key` is
/// `None`. The public half stays in the clear so the wrapped form can still
/// lock data for its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAsymmetricKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_key: Option<EncryptedSymmetricKey>,
    pub enc_private_key: LockedBox,
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    pub origin: String,
}

impl EncryptedAsymmetricKey {
    pub fn create(
        original: &AsymmetricKey,
        wrap_with: &Key,
        registry: &EncryptionRegistry,
    ) -> CryptoResult<Self> {
        let private = OpenBox::new(original.private_key().to_vec());
        let (enc_key, enc_private_key) = match wrap_with {
            Key::Symmetric(symmetric) => (None, symmetric.lock(&private, registry)?),
            other => {
                let intermediate = SymmetricKey::generate(registry)?;
                let enc_private_key = intermediate.lock(&private, registry)?;
                let enc_key = EncryptedSymmetricKey::create(&intermediate, other, registry)?;
                (Some(enc_key), enc_private_key)
            }
        };
        Ok(Self {
            enc_key,
            enc_private_key,
            public_key: original.public_key().to_vec(),
            origin: original.origin().to_string(),
        })
    }

    pub fn decrypt(&self, unlock_with: &Key, registry: &EncryptionRegistry) -> CryptoResult<AsymmetricKey> {
        let private = match &self.enc_key {
            Some(enc_key) => {
                let intermediate = enc_key.decrypt(unlock_with, registry)?;
                intermediate.unlock(&self.enc_private_key, registry)?
            }
            None => unlock_with.unlock(&self.enc_private_key, registry)?,
        };
        Ok(AsymmetricKey::from_parts(
            private.as_bytes().to_vec(),
            self.public_key.clone(),
            self.origin.clone(),
        ))
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn lock(&self, open: &OpenBox, registry: &EncryptionRegistry) -> CryptoResult<LockedBox> {
        lock_with_public(&self.public_key, &self.origin, open, registry)
    }
}

// ============================================================================
// Key
// ============================================================================

/// Any key the system handles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Symmetric(SymmetricKey),
    Asymmetric(AsymmetricKey),
    EncryptedSymmetric(EncryptedSymmetricKey),
    EncryptedAsymmetric(EncryptedAsymmetricKey),
}

impl Key {
    pub fn origin(&self) -> &str {
        match self {
            Key::Symmetric(k) => k.origin(),
            Key::Asymmetric(k) => k.origin(),
            Key::EncryptedSymmetric(k) => &k.origin,
            Key::EncryptedAsymmetric(k) => &k.origin,
        }
    }

    /// Locks a box. An encrypted symmetric key can not lock.
    pub fn lock(&self, open: &OpenBox, registry: &EncryptionRegistry) -> CryptoResult<LockedBox> {
        match self {
            Key::Symmetric(k) => k.lock(open, registry),
            Key::Asymmetric(k) => k.lock(open, registry),
            Key::EncryptedAsymmetric(k) => k.lock(open, registry),
            Key::EncryptedSymmetric(_) => Err(CryptoError::NotDirectlyUsable("lock")),
        }
    }

    /// Unlocks a box. Only raw keys can unlock.
    pub fn unlock(&self, locked: &LockedBox, registry: &EncryptionRegistry) -> CryptoResult<OpenBox> {
        match self {
            Key::Symmetric(k) => k.unlock(locked, registry),
            Key::Asymmetric(k) => k.unlock(locked, registry),
            Key::EncryptedSymmetric(_) | Key::EncryptedAsymmetric(_) => {
                Err(CryptoError::NotDirectlyUsable("unlock"))
            }
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Key::EncryptedSymmetric(_) | Key::EncryptedAsymmetric(_))
    }
}

impl From<SymmetricKey> for Key {
    fn from(key: SymmetricKey) -> Self {
        Key::Symmetric(key)
    }
}

impl From<AsymmetricKey> for Key {
    fn from(key: AsymmetricKey) -> Self {
        Key::Asymmetric(key)
    }
}

impl From<EncryptedSymmetricKey> for Key {
    fn from(key: EncryptedSymmetricKey) -> Self {
        Key::EncryptedSymmetric(key)
    }
}

impl From<EncryptedAsymmetricKey> for Key {
    fn from(key: EncryptedAsymmetricKey) -> Self {
        Key::EncryptedAsymmetric(key)
    }
}
