//! Content stored inside a folder.
//!
//! Each payload is sealed under its own content key. The folder only keeps the
//! content key wrapped under the folder key, so rotating the folder key means
//! re-wrapping small keys instead of re-encrypting payloads.

use crate::context::KeyContext;
use crate::error::{FolderError, FolderResult};
use crate::folder::Folder;
use crate::principal::Member;
use keyfold_crypto::{
    EncryptedSymmetricKey, EncryptionRegistry, Key, LockedBox, OpenBox, SymmetricKey,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A named, sealed payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    name: String,
    payload: LockedBox,
}

impl Content {
    pub fn new(name: impl Into<String>, payload: LockedBox) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Seals `plaintext` under a fresh content key and returns both.
    pub fn seal(
        name: impl Into<String>,
        plaintext: &[u8],
        registry: &EncryptionRegistry,
    ) -> FolderResult<(Self, SymmetricKey)> {
        let key = SymmetricKey::generate(registry)?;
        let payload = key.lock(&OpenBox::new(plaintext.to_vec()), registry)?;
        Ok((Self::new(name, payload), key))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &LockedBox {
        &self.payload
    }

    pub fn open(&self, key: &SymmetricKey, registry: &EncryptionRegistry) -> FolderResult<OpenBox> {
        Ok(key.unlock(&self.payload, registry)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredContent {
    content: Content,
    key: EncryptedSymmetricKey,
}

fn not_found(name: &str) -> FolderError {
    FolderError::NotFound(format!("content '{name}'"))
}

impl Folder {
    fn wrap_content_key(
        &self,
        key: &SymmetricKey,
        by: &dyn Member,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<EncryptedSymmetricKey> {
        let folder_key = self.resolve_key(by, ctx)?;
        Ok(EncryptedSymmetricKey::create(
            key,
            &Key::Symmetric(folder_key),
            ctx.registry,
        )?)
    }

    /// Stores `content` with its key wrapped under the folder key.
    pub fn add_content(
        &mut self,
        content: Content,
        key: &SymmetricKey,
        by: &dyn Member,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<()> {
        if self.content.contains_key(content.name()) {
            return Err(FolderError::DuplicateName(content.name().to_string()));
        }
        let wrapped = self.wrap_content_key(key, by, ctx)?;
        self.content.insert(
            content.name().to_string(),
            StoredContent {
                content,
                key: wrapped,
            },
        );
        Ok(())
    }

    pub fn update_content(
        &mut self,
        content: Content,
        key: &SymmetricKey,
        by: &dyn Member,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<()> {
        if !self.content.contains_key(content.name()) {
            return Err(not_found(content.name()));
        }
        let wrapped = self.wrap_content_key(key, by, ctx)?;
        self.content.insert(
            content.name().to_string(),
            StoredContent {
                content,
                key: wrapped,
            },
        );
        Ok(())
    }

    pub fn delete_content(&mut self, name: &str) -> FolderResult<Content> {
        self.content
            .remove(name)
            .map(|stored| stored.content)
            .ok_or_else(|| not_found(name))
    }

    pub fn get_content(&self, name: &str) -> FolderResult<&Content> {
        self.content
            .get(name)
            .map(|stored| &stored.content)
            .ok_or_else(|| not_found(name))
    }

    pub fn content_names(&self) -> Vec<&str> {
        self.content.keys().map(String::as_str).collect()
    }

    /// Resolves the folder key for `requestor` and unwraps the content key.
    pub fn get_content_key(
        &self,
        name: &str,
        requestor: &dyn Member,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<SymmetricKey> {
        let stored = self.content.get(name).ok_or_else(|| not_found(name))?;
        let folder_key = self.resolve_key(requestor, ctx)?;
        Ok(stored.key.decrypt(&Key::Symmetric(folder_key), ctx.registry)?)
    }

    /// The version tag shared by all content keys, `None` without content.
    pub fn content_encryption_version(&self) -> FolderResult<Option<String>> {
        let versions: BTreeSet<&str> = self
            .content
            .values()
            .map(|stored| stored.key.origin.as_str())
            .collect();
        match versions.len() {
            0 => Ok(None),
            1 => Ok(versions.into_iter().next().map(str::to_string)),
            _ => Err(FolderError::InconsistentEncryptionVersion {
                owner: self.id(),
                versions: versions.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    /// Re-wraps every content key from `old_folder_key` to `new_folder_key`.
    /// Payloads are not touched.
    pub fn reencrypt(
        &mut self,
        old_folder_key: &SymmetricKey,
        new_folder_key: &SymmetricKey,
        registry: &EncryptionRegistry,
    ) -> FolderResult<()> {
        self.content = self.reencrypted_content(old_folder_key, new_folder_key, registry)?;
        Ok(())
    }

    pub(crate) fn reencrypted_content(
        &self,
        old_folder_key: &SymmetricKey,
        new_folder_key: &SymmetricKey,
        registry: &EncryptionRegistry,
    ) -> FolderResult<BTreeMap<String, StoredContent>> {
        let old = Key::Symmetric(old_folder_key.clone());
        let new = Key::Symmetric(new_folder_key.clone());

        let mut content = BTreeMap::new();
        for (name, stored) in &self.content {
            let key = stored.key.decrypt(&old, registry)?;
            content.insert(
                name.clone(),
                StoredContent {
                    content: stored.content.clone(),
                    key: EncryptedSymmetricKey::create(&key, &new, registry)?,
                },
            );
        }
        debug!("re-encrypted {} content keys of folder {}", content.len(), self.id());
        Ok(content)
    }

    /// The wrapped key of a content entry.
    pub fn wrapped_content_key(&self, name: &str) -> FolderResult<&EncryptedSymmetricKey> {
        self.content
            .get(name)
            .map(|stored| &stored.key)
            .ok_or_else(|| not_found(name))
    }
}
