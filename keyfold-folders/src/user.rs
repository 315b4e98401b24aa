//! User principals and their keyrings.

use crate::error::{FolderError, FolderResult};
use crate::principal::{Member, Principal};
use keyfold_crypto::{
    AsymmetricKey, EncryptedAsymmetricKey, EncryptionRegistry, KdfParams, Key, Salt, SymmetricKey,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's private key sealed under a password-derived key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeyPair {
    pub salt: Salt,
    pub kdf: KdfParams,
    pub key: EncryptedAsymmetricKey,
}

impl SealedKeyPair {
    fn seal(
        pair: &AsymmetricKey,
        password: &str,
        kdf: KdfParams,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Self> {
        let salt = Salt::random();
        let password_key = SymmetricKey::derive_from_password(password, &salt, &kdf, registry)?;
        let key = EncryptedAsymmetricKey::create(pair, &Key::Symmetric(password_key), registry)?;
        Ok(Self { salt, kdf, key })
    }

    fn open(&self, password: &str, registry: &EncryptionRegistry) -> FolderResult<AsymmetricKey> {
        let password_key =
            SymmetricKey::derive_from_password(password, &self.salt, &self.kdf, registry)?;
        Ok(self.key.decrypt(&Key::Symmetric(password_key), registry)?)
    }
}

/// An organization user.
///
/// Folder keys are wrapped under the user's public key. Unwrapping needs the
/// private key, which is only available while the user is unlocked.
#[derive(Clone, Debug)]
pub struct User {
    id: Uuid,
    org_id: i64,
    name: String,
    groups: Vec<Uuid>,
    sealed: Option<SealedKeyPair>,
    unlocked: Option<AsymmetricKey>,
}

impl User {
    /// Creates a user whose key pair only lives in memory.
    pub fn generate(
        org_id: i64,
        name: impl Into<String>,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            groups: Vec::new(),
            sealed: None,
            unlocked: Some(AsymmetricKey::generate(registry)?),
        })
    }

    /// Creates an unlocked user whose private key is sealed under `password`.
    pub fn with_password(
        org_id: i64,
        name: impl Into<String>,
        password: &str,
        kdf: KdfParams,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Self> {
        let pair = AsymmetricKey::generate(registry)?;
        let sealed = SealedKeyPair::seal(&pair, password, kdf, registry)?;
        Ok(Self {
            id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            groups: Vec::new(),
            sealed: Some(sealed),
            unlocked: Some(pair),
        })
    }

    /// Restores a locked user from its persisted keyring.
    pub fn from_sealed(id: Uuid, org_id: i64, name: impl Into<String>, sealed: SealedKeyPair) -> Self {
        Self {
            id,
            org_id,
            name: name.into(),
            groups: Vec::new(),
            sealed: Some(sealed),
            unlocked: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sealed(&self) -> Option<&SealedKeyPair> {
        self.sealed.as_ref()
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.is_some()
    }

    /// Opens the sealed private key. A wrong password fails with a crypto error.
    pub fn unlock(&mut self, password: &str, registry: &EncryptionRegistry) -> FolderResult<()> {
        let sealed = self.sealed.as_ref().ok_or(FolderError::PrincipalLocked(self.id))?;
        self.unlocked = Some(sealed.open(password, registry)?);
        Ok(())
    }

    /// Forgets the private key. A user without a sealed key can not be
    /// unlocked again afterwards.
    pub fn lock(&mut self) {
        self.unlocked = None;
    }

    /// Replaces the key pair. Folder keys wrapped for the old pair can no
    /// longer be unwrapped and have to be invalidated and fixed.
    pub fn reset_credentials(
        &mut self,
        password: &str,
        kdf: KdfParams,
        registry: &EncryptionRegistry,
    ) -> FolderResult<()> {
        let pair = AsymmetricKey::generate(registry)?;
        let sealed = SealedKeyPair::seal(&pair, password, kdf, registry)?;
        self.sealed = Some(sealed);
        self.unlocked = Some(pair);
        Ok(())
    }

    pub fn join_group(&mut self, group: Uuid) {
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
    }

    pub fn leave_group(&mut self, group: Uuid) {
        self.groups.retain(|g| *g != group);
    }
}

impl Principal for User {
    fn id(&self) -> Uuid {
        self.id
    }

    fn get_encryption_key(
        &self,
        _requestor: Option<&dyn Member>,
        _registry: &EncryptionRegistry,
    ) -> FolderResult<Key> {
        if let Some(sealed) = &self.sealed {
            return Ok(Key::EncryptedAsymmetric(sealed.key.clone()));
        }
        self.unlocked
            .clone()
            .map(Key::Asymmetric)
            .ok_or(FolderError::PrincipalLocked(self.id))
    }

    fn get_decryption_key(
        &self,
        requestor: &dyn Member,
        _registry: &EncryptionRegistry,
    ) -> FolderResult<Key> {
        if requestor.id() != self.id {
            return Err(FolderError::NoKeyFound(self.id));
        }
        self.unlocked
            .clone()
            .map(Key::Asymmetric)
            .ok_or(FolderError::PrincipalLocked(self.id))
    }
}

impl Member for User {
    fn org_id(&self) -> i64 {
        self.org_id
    }

    fn group_memberships(&self) -> Vec<Uuid> {
        self.groups.clone()
    }
}
