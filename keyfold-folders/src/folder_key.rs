//! Wrapped copies of folder keys.
//!
//! A folder's symmetric key is never stored in the clear. Each principal with
//! access holds its own copy wrapped under its encryption key, and a subfolder
//! holds its key wrapped under its parent's key.
//!
//! All wrapped copies share one JSON envelope:
//! `{"owner": "<uuid>", "key": {"enc_key": <box>, "origin": "<tag>"}, "type": "FOLDER", "is_valid": true}`.

use crate::error::FolderResult;
use keyfold_crypto::{EncryptedSymmetricKey, EncryptionRegistry, Key, SymmetricKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::marker::PhantomData;
use uuid::Uuid;

/// Distinguishes the kinds of wrapped key on the wire.
pub trait KeyKind {
    const TYPE: &'static str;
}

/// Folder key wrapped for a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfUser;

/// Folder key (or a group's own key) wrapped for a group or group member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfGroup;

/// Child folder key wrapped under its parent's key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfParent;

impl KeyKind for OfUser {
    const TYPE: &'static str = "FOLDER";
}

impl KeyKind for OfGroup {
    const TYPE: &'static str = "GROUP";
}

impl KeyKind for OfParent {
    const TYPE: &'static str = "PARENT";
}

/// A raw folder key together with the principal it was unwrapped for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderKey {
    owner: Uuid,
    key: SymmetricKey,
}

impl FolderKey {
    pub fn new(owner: Uuid, key: SymmetricKey) -> Self {
        Self { owner, key }
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }

    pub fn into_key(self) -> SymmetricKey {
        self.key
    }

    /// Wraps the key for `owner` under `wrap_with`.
    pub fn encrypt_for<K: KeyKind>(
        &self,
        owner: Uuid,
        wrap_with: &Key,
        registry: &EncryptionRegistry,
    ) -> FolderResult<EncryptedKeyOf<K>> {
        let key = EncryptedSymmetricKey::create(&self.key, wrap_with, registry)?;
        Ok(EncryptedKeyOf::new(owner, key))
    }
}

/// A wrapped folder key held by `owner`.
///
/// `is_valid` is cleared when the owner's unwrap key changes. Invalid entries
/// are kept so they can be repaired later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedKeyOf<K> {
    owner: Uuid,
    key: EncryptedSymmetricKey,
    is_valid: bool,
    kind: PhantomData<K>,
}

pub type EncryptedFolderKeyOfUser = EncryptedKeyOf<OfUser>;
pub type EncryptedFolderKeyOfGroup = EncryptedKeyOf<OfGroup>;
pub type EncryptedGroupKeyOfMember = EncryptedKeyOf<OfGroup>;
pub type ParentKey = EncryptedKeyOf<OfParent>;

impl<K> EncryptedKeyOf<K> {
    pub fn new(owner: Uuid, key: EncryptedSymmetricKey) -> Self {
        Self {
            owner,
            key,
            is_valid: true,
            kind: PhantomData,
        }
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Version tag of the wrapped folder key.
    pub fn origin(&self) -> &str {
        &self.key.origin
    }

    pub fn wrapped(&self) -> &EncryptedSymmetricKey {
        &self.key
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    pub fn decrypt(&self, unwrap_with: &Key, registry: &EncryptionRegistry) -> FolderResult<FolderKey> {
        let key = self.key.decrypt(unwrap_with, registry)?;
        Ok(FolderKey::new(self.owner, key))
    }
}

#[derive(Serialize)]
struct WireKeyRef<'a> {
    owner: Uuid,
    key: &'a EncryptedSymmetricKey,
    #[serde(rename = "type")]
    kind: &'static str,
    is_valid: bool,
}

#[derive(Deserialize)]
struct WireKey {
    owner: Uuid,
    key: EncryptedSymmetricKey,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_valid")]
    is_valid: bool,
}

fn default_valid() -> bool {
    true
}

impl<K: KeyKind> Serialize for EncryptedKeyOf<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireKeyRef {
            owner: self.owner,
            key: &self.key,
            kind: K::TYPE,
            is_valid: self.is_valid,
        }
        .serialize(serializer)
    }
}

impl<'de, K: KeyKind> Deserialize<'de> for EncryptedKeyOf<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireKey::deserialize(deserializer)?;
        if wire.kind != K::TYPE {
            return Err(serde::de::Error::custom(format!(
                "expected key of type '{}', found '{}'",
                K::TYPE,
                wire.kind
            )));
        }
        Ok(Self {
            owner: wire.owner,
            key: wire.key,
            is_valid: wire.is_valid,
            kind: PhantomData,
        })
    }
}
