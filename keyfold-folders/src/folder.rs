//! The folder aggregate.
//!
//! A folder owns the wrapped copies of its key (one per user or group with
//! direct access), the link to its parent and the [`ParentKey`] that lets
//! everyone with access to the parent reach this folder too.
//!
//! Key resolution tries, in order:
//! 1. a valid key wrapped directly for the requestor,
//! 2. a valid key wrapped for one of the requestor's groups,
//! 3. the parent's key, unless inheritance is stopped.
//!
//! Every operation either succeeds or returns an error with the folder left
//! untouched.

use crate::content::StoredContent;
use crate::context::KeyContext;
use crate::error::{FolderError, FolderResult};
use crate::folder_key::{
    EncryptedFolderKeyOfGroup, EncryptedFolderKeyOfUser, FolderKey, OfParent, ParentKey,
};
use crate::principal::{Member, Principal};
use keyfold_crypto::{CryptoError, Key, SymmetricKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A wrapped key that no longer opens leaves its holder without a key.
fn unopenable_as_no_key(err: FolderError, requestor: Uuid) -> FolderError {
    match err {
        FolderError::Crypto(CryptoError::Decryption(_)) => FolderError::NoKeyFound(requestor),
        other => other,
    }
}

/// A reference to something an external repository filed into a folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderItem {
    pub uuid: Uuid,
    pub name: String,
    pub repository: String,
}

impl FolderItem {
    pub fn new(uuid: Uuid, name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            repository: repository.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Folder {
    id: Uuid,
    name: String,
    org_id: i64,
    #[serde(default)]
    parent: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enc_parent_key: Option<ParentKey>,
    #[serde(default)]
    keys: Vec<EncryptedFolderKeyOfUser>,
    #[serde(default)]
    group_keys: Vec<EncryptedFolderKeyOfGroup>,
    #[serde(default)]
    items: Vec<FolderItem>,
    #[serde(default)]
    pub(crate) content: BTreeMap<String, StoredContent>,
    #[serde(default)]
    stop_inherit: bool,
    #[serde(default)]
    restricted: bool,
}

impl Folder {
    /// Creates an empty folder without any key material.
    pub fn create(name: impl Into<String>, org_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            org_id,
            parent: None,
            enc_parent_key: None,
            keys: Vec::new(),
            group_keys: Vec::new(),
            items: Vec::new(),
            content: BTreeMap::new(),
            stop_inherit: false,
            restricted: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn org_id(&self) -> i64 {
        self.org_id
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub fn parent_key(&self) -> Option<&ParentKey> {
        self.enc_parent_key.as_ref()
    }

    pub fn keys(&self) -> &[EncryptedFolderKeyOfUser] {
        &self.keys
    }

    pub fn group_keys(&self) -> &[EncryptedFolderKeyOfGroup] {
        &self.group_keys
    }

    pub fn items(&self) -> &[FolderItem] {
        &self.items
    }

    pub fn stop_inherit(&self) -> bool {
        self.stop_inherit
    }

    pub fn restricted(&self) -> bool {
        self.restricted
    }

    fn has_key_material(&self) -> bool {
        !self.keys.is_empty() || !self.group_keys.is_empty() || self.enc_parent_key.is_some()
    }

    fn valid_own_keys(&self) -> usize {
        self.keys.iter().filter(|k| k.is_valid()).count()
            + self.group_keys.iter().filter(|k| k.is_valid()).count()
    }

    /// Without inheritance a folder is only reachable through its own keys.
    fn relies_on_own_keys(&self) -> bool {
        self.stop_inherit || self.parent.is_none()
    }

    // ========================================================================
    // Encryption version
    // ========================================================================

    /// The version tag shared by all key entries, `None` without keys.
    pub fn encryption_version(&self) -> FolderResult<Option<String>> {
        let versions: BTreeSet<&str> = self
            .keys
            .iter()
            .map(|k| k.origin())
            .chain(self.group_keys.iter().map(|k| k.origin()))
            .chain(self.enc_parent_key.iter().map(|k| k.origin()))
            .collect();

        match versions.len() {
            0 => Ok(None),
            1 => Ok(versions.into_iter().next().map(str::to_string)),
            _ => Err(FolderError::InconsistentEncryptionVersion {
                owner: self.id,
                versions: versions.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    // ========================================================================
    // Key resolution
    // ========================================================================

    /// Resolves this folder's key for `requestor`.
    ///
    /// The parent chain is walked iteratively through `ctx.folders` and the
    /// collected parent keys are unwrapped from the top down.
    pub fn resolve_key(&self, requestor: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<SymmetricKey> {
        let mut chain: Vec<&ParentKey> = Vec::new();
        let mut current: &Folder = self;

        let top_key = loop {
            current.encryption_version()?;
            if let Some(key) = current.own_key(requestor, ctx)? {
                break key;
            }
            if current.stop_inherit {
                return Err(FolderError::NoKeyFound(requestor.id()));
            }
            let (Some(parent_id), Some(parent_key)) = (current.parent, current.enc_parent_key.as_ref())
            else {
                return Err(FolderError::NoKeyFound(requestor.id()));
            };
            if chain.len() >= ctx.max_depth {
                return Err(FolderError::HierarchyTooDeep(ctx.max_depth));
            }
            chain.push(parent_key);
            current = ctx
                .folders
                .folder(parent_id)
                .ok_or(FolderError::FolderNotFound(parent_id))?;
        };

        let mut key = top_key;
        for parent_key in chain.iter().rev() {
            key = parent_key
                .decrypt(&Key::Symmetric(key), ctx.registry)
                .map_err(|e| unopenable_as_no_key(e, requestor.id()))?
                .into_key();
        }
        Ok(key)
    }

    /// Direct key first, then group keys. Never looks at the parent.
    fn own_key(&self, requestor: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<Option<SymmetricKey>> {
        if let Some(entry) = self
            .keys
            .iter()
            .find(|k| k.owner() == requestor.id() && k.is_valid())
        {
            let unlock_key = requestor.get_decryption_key(requestor, ctx.registry)?;
            let key = entry
                .decrypt(&unlock_key, ctx.registry)
                .map_err(|e| unopenable_as_no_key(e, requestor.id()))?;
            return Ok(Some(key.into_key()));
        }

        for group_id in requestor.group_memberships() {
            let Some(entry) = self
                .group_keys
                .iter()
                .find(|k| k.owner() == group_id && k.is_valid())
            else {
                continue;
            };
            let Some(group) = ctx.groups.group(group_id) else {
                continue;
            };
            match group.get_decryption_key(requestor, ctx.registry) {
                Ok(unlock_key) => {
                    let key = entry
                        .decrypt(&unlock_key, ctx.registry)
                        .map_err(|e| unopenable_as_no_key(e, requestor.id()))?;
                    return Ok(Some(key.into_key()));
                }
                Err(FolderError::NotAMember { .. })
                | Err(FolderError::KeysNeedRepair(_))
                | Err(FolderError::Crypto(CryptoError::Decryption(_))) => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Whether `requestor` can reach this folder's key, judged from the key
    /// entries alone without unwrapping anything.
    pub fn has_access(&self, requestor: &dyn Member, ctx: &KeyContext<'_>) -> bool {
        let groups = requestor.group_memberships();
        let mut current: &Folder = self;
        for _ in 0..=ctx.max_depth {
            if current.has_valid_direct_key(requestor.id())
                || current
                    .group_keys
                    .iter()
                    .any(|k| k.is_valid() && groups.contains(&k.owner()))
            {
                return true;
            }
            if current.stop_inherit || current.enc_parent_key.is_none() {
                return false;
            }
            match current.parent.and_then(|id| ctx.folders.folder(id)) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    pub fn has_direct_access(&self, owner: Uuid) -> bool {
        self.keys.iter().any(|k| k.owner() == owner)
            || self.group_keys.iter().any(|k| k.owner() == owner)
    }

    fn has_valid_direct_key(&self, owner: Uuid) -> bool {
        self.keys.iter().any(|k| k.owner() == owner && k.is_valid())
    }

    pub fn has_invalid_keys(&self, owner: Uuid) -> bool {
        self.keys.iter().any(|k| k.owner() == owner && !k.is_valid())
    }

    pub fn get_encryption_key(&self, requestor: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<SymmetricKey> {
        self.resolve_key(requestor, ctx)
    }

    pub fn get_decryption_key(&self, requestor: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<SymmetricKey> {
        self.resolve_key(requestor, ctx)
    }

    /// The existing key resolved through `by`, or a fresh one if the folder
    /// has no key material yet.
    fn current_or_new_key(&self, by: Option<&dyn Member>, requestor: Uuid, ctx: &KeyContext<'_>) -> FolderResult<SymmetricKey> {
        if !self.has_key_material() {
            return Ok(SymmetricKey::generate(ctx.registry)?);
        }
        let by = by.ok_or(FolderError::NoKeyFound(requestor))?;
        self.resolve_key(by, ctx)
    }

    // ========================================================================
    // Access lifecycle
    // ========================================================================

    /// Wraps the folder key for `to`. The very first grant generates the key.
    pub fn grant_access(
        &mut self,
        to: &dyn Member,
        by: Option<&dyn Member>,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<()> {
        if to.org_id() != self.org_id {
            return Err(FolderError::OrganizationMismatch {
                expected: self.org_id,
                found: to.org_id(),
            });
        }
        if self.has_invalid_keys(to.id()) {
            return Err(FolderError::KeysNeedRepair(to.id()));
        }
        if self.has_valid_direct_key(to.id()) || self.resolve_key(to, ctx).is_ok() {
            return Err(FolderError::AlreadyHasAccess(to.id()));
        }

        let folder_key = FolderKey::new(self.id, self.current_or_new_key(by, to.id(), ctx)?);
        let lock_key = to.get_encryption_key(None, ctx.registry)?;
        let entry = folder_key.encrypt_for(to.id(), &lock_key, ctx.registry)?;
        self.keys.push(entry);

        info!("granted access to folder {} for {}", self.id, to.id());
        Ok(())
    }

    /// Wraps the folder key under the group's key. `by` must be a member of
    /// the group to reach that key.
    pub fn grant_access_to_group(
        &mut self,
        group: &dyn Principal,
        by: &dyn Member,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<()> {
        if self.group_keys.iter().any(|k| k.owner() == group.id()) {
            return Err(FolderError::AlreadyHasAccess(group.id()));
        }

        let folder_key = FolderKey::new(self.id, self.current_or_new_key(Some(by), group.id(), ctx)?);
        let lock_key = group.get_encryption_key(Some(by), ctx.registry)?;
        let entry = folder_key.encrypt_for(group.id(), &lock_key, ctx.registry)?;
        self.group_keys.push(entry);

        info!("granted access to folder {} for group {} by {}", self.id, group.id(), by.id());
        Ok(())
    }

    pub fn revoke_access(&mut self, of: &dyn Principal) -> FolderResult<()> {
        let of = of.id();
        if !self.keys.iter().any(|k| k.owner() == of) {
            return Err(FolderError::NoDirectAccess(of));
        }
        let remaining = self.valid_own_keys()
            - self.keys.iter().filter(|k| k.owner() == of && k.is_valid()).count();
        if self.relies_on_own_keys() && remaining == 0 {
            warn!("refused to revoke the last valid key of folder {} from {of}", self.id);
            return Err(FolderError::WouldStrandFolder(self.id));
        }

        self.keys.retain(|k| k.owner() != of);
        info!("revoked access to folder {} from {of}", self.id);
        Ok(())
    }

    pub fn revoke_access_from_group(&mut self, group: &dyn Principal) -> FolderResult<()> {
        let group = group.id();
        if !self.group_keys.iter().any(|k| k.owner() == group) {
            return Err(FolderError::NoDirectAccess(group));
        }
        let remaining = self.valid_own_keys()
            - self
                .group_keys
                .iter()
                .filter(|k| k.owner() == group && k.is_valid())
                .count();
        if self.relies_on_own_keys() && remaining == 0 {
            warn!("refused to revoke the last valid key of folder {} from group {group}", self.id);
            return Err(FolderError::WouldStrandFolder(self.id));
        }

        self.group_keys.retain(|k| k.owner() != group);
        info!("revoked access to folder {} from group {group}", self.id);
        Ok(())
    }

    /// Flags every direct key of `owner` as invalid. Returns how many were
    /// flagged.
    pub fn invalidate_keys_of(&mut self, owner: Uuid) -> usize {
        let mut count = 0;
        for key in self
            .keys
            .iter_mut()
            .filter(|k| k.owner() == owner && k.is_valid())
        {
            key.invalidate();
            count += 1;
        }
        if count > 0 {
            debug!("invalidated {count} keys of {owner} on folder {}", self.id);
        }
        count
    }

    /// Replaces the invalid entry of `of` with a fresh copy of the folder key
    /// resolved through `by`.
    pub fn fix_keys(&mut self, of: &dyn Member, by: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<()> {
        if !self.has_invalid_keys(of.id()) {
            return Err(FolderError::NothingToFix(of.id()));
        }

        let folder_key = FolderKey::new(self.id, self.resolve_key(by, ctx)?);
        let lock_key = of.get_encryption_key(None, ctx.registry)?;
        let entry = folder_key.encrypt_for(of.id(), &lock_key, ctx.registry)?;

        self.keys.retain(|k| k.owner() != of.id());
        self.keys.push(entry);
        info!("fixed keys of {} on folder {} by {}", of.id(), self.id, by.id());
        Ok(())
    }

    pub fn stop_inheritance(&mut self) -> FolderResult<()> {
        if self.valid_own_keys() == 0 {
            return Err(FolderError::WouldStrandFolder(self.id));
        }
        self.stop_inherit = true;
        Ok(())
    }

    pub fn allow_inheritance(&mut self) {
        self.stop_inherit = false;
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Fails if `candidate` is this folder or lies below it.
    fn check_not_below_self(&self, candidate: &Folder, ctx: &KeyContext<'_>) -> FolderResult<()> {
        let cycle = || FolderError::WouldCreateCycle {
            folder: self.id,
            parent: candidate.id,
        };
        let mut current: &Folder = candidate;
        for _ in 0..=ctx.max_depth {
            if current.id == self.id {
                return Err(cycle());
            }
            let Some(parent_id) = current.parent else {
                return Ok(());
            };
            if parent_id == self.id {
                return Err(cycle());
            }
            match ctx.folders.folder(parent_id) {
                Some(parent) => current = parent,
                None => return Ok(()),
            }
        }
        Err(FolderError::HierarchyTooDeep(ctx.max_depth))
    }

    fn check_new_parent(&self, parent: &Folder, ctx: &KeyContext<'_>) -> FolderResult<()> {
        if parent.restricted {
            return Err(FolderError::ParentRestricted(parent.id));
        }
        if parent.org_id != self.org_id {
            return Err(FolderError::OrganizationMismatch {
                expected: self.org_id,
                found: parent.org_id,
            });
        }
        self.check_not_below_self(parent, ctx)
    }

    /// Attaches this folder below `parent`. Allowed only once.
    pub fn set_parent(&mut self, parent: &Folder, by: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<()> {
        if self.parent.is_some() {
            return Err(FolderError::ParentAlreadySet(self.id));
        }
        self.check_new_parent(parent, ctx)?;

        let parent_key = parent.resolve_key(by, ctx)?;
        let own_key = FolderKey::new(self.id, self.current_or_new_key(Some(by), by.id(), ctx)?);
        let enc_parent_key =
            own_key.encrypt_for::<OfParent>(self.id, &Key::Symmetric(parent_key), ctx.registry)?;

        self.parent = Some(parent.id);
        self.enc_parent_key = Some(enc_parent_key);
        info!("set parent of folder {} to {}", self.id, parent.id);
        Ok(())
    }

    /// Re-attaches this folder below `target`.
    ///
    /// The checks always run; the move itself needs the `folder-move` feature.
    pub fn move_to(&mut self, target: &Folder, by: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<()> {
        self.check_new_parent(target, ctx)?;
        if !cfg!(feature = "folder-move") {
            return Err(FolderError::MoveDisabled);
        }

        let target_key = target.resolve_key(by, ctx)?;
        let own_key = FolderKey::new(self.id, self.current_or_new_key(Some(by), by.id(), ctx)?);
        let enc_parent_key =
            own_key.encrypt_for::<OfParent>(self.id, &Key::Symmetric(target_key), ctx.registry)?;

        let previous = self.parent.replace(target.id);
        self.enc_parent_key = Some(enc_parent_key);
        info!("moved folder {} from {previous:?} to {}", self.id, target.id);
        Ok(())
    }

    /// Re-wraps the parent key after the parent's key was rotated.
    pub(crate) fn rewrap_parent_key(
        &mut self,
        old_parent_key: &SymmetricKey,
        new_parent_key: &SymmetricKey,
        ctx: &KeyContext<'_>,
    ) -> FolderResult<()> {
        let Some(parent_key) = &self.enc_parent_key else {
            return Ok(());
        };
        let own_key = parent_key.decrypt(&Key::Symmetric(old_parent_key.clone()), ctx.registry)?;
        self.enc_parent_key = Some(own_key.encrypt_for::<OfParent>(
            self.id,
            &Key::Symmetric(new_parent_key.clone()),
            ctx.registry,
        )?);
        Ok(())
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Replaces the folder key with a fresh one.
    ///
    /// Every key entry is re-wrapped for its owner, who must be among
    /// `holders`. Entries keep their validity flag. The parent key and all
    /// content keys are re-wrapped too. Returns `(old, new)` so callers can
    /// re-wrap the parent keys of subfolders.
    pub fn rotate_key(
        &mut self,
        by: &dyn Member,
        holders: &[&dyn Principal],
        ctx: &KeyContext<'_>,
    ) -> FolderResult<(SymmetricKey, SymmetricKey)> {
        let old_key = self.resolve_key(by, ctx)?;
        let new_key = FolderKey::new(self.id, SymmetricKey::generate(ctx.registry)?);

        let holder = |owner: Uuid| {
            holders
                .iter()
                .find(|h| h.id() == owner)
                .ok_or(FolderError::MissingPrincipal(owner))
        };

        let mut keys = Vec::with_capacity(self.keys.len());
        for entry in &self.keys {
            let lock_key = holder(entry.owner())?.get_encryption_key(Some(by), ctx.registry)?;
            let mut rewrapped: EncryptedFolderKeyOfUser =
                new_key.encrypt_for(entry.owner(), &lock_key, ctx.registry)?;
            if !entry.is_valid() {
                rewrapped.invalidate();
            }
            keys.push(rewrapped);
        }

        let mut group_keys = Vec::with_capacity(self.group_keys.len());
        for entry in &self.group_keys {
            let lock_key = holder(entry.owner())?.get_encryption_key(Some(by), ctx.registry)?;
            let mut rewrapped: EncryptedFolderKeyOfGroup =
                new_key.encrypt_for(entry.owner(), &lock_key, ctx.registry)?;
            if !entry.is_valid() {
                rewrapped.invalidate();
            }
            group_keys.push(rewrapped);
        }

        let enc_parent_key = match self.parent {
            Some(parent_id) if self.enc_parent_key.is_some() => {
                let parent = ctx
                    .folders
                    .folder(parent_id)
                    .ok_or(FolderError::FolderNotFound(parent_id))?;
                let parent_key = parent.resolve_key(by, ctx)?;
                Some(new_key.encrypt_for::<OfParent>(
                    self.id,
                    &Key::Symmetric(parent_key),
                    ctx.registry,
                )?)
            }
            _ => None,
        };

        let content = self.reencrypted_content(&old_key, new_key.key(), ctx.registry)?;

        self.keys = keys;
        self.group_keys = group_keys;
        self.enc_parent_key = enc_parent_key;
        self.content = content;
        info!("rotated key of folder {} by {}", self.id, by.id());
        Ok((old_key, new_key.into_key()))
    }

    // ========================================================================
    // Restriction and information
    // ========================================================================

    /// Marks the folder as holding a record.
    pub fn restrict(&mut self) {
        self.restricted = true;
    }

    /// Renames the folder. A restricted folder only accepts `force`.
    pub fn update_information(&mut self, name: Option<&str>, force: bool) -> FolderResult<()> {
        if self.restricted && !force {
            return Err(FolderError::NameLocked(self.id));
        }
        if let Some(name) = name {
            self.name = name.to_string();
        }
        Ok(())
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Files an item into the folder, replacing an item with the same uuid.
    pub fn add_item(&mut self, item: FolderItem) {
        self.items.retain(|i| i.uuid != item.uuid);
        self.items.push(item);
    }

    pub fn update_item(&mut self, item: FolderItem) -> FolderResult<()> {
        let existing = self
            .items
            .iter_mut()
            .find(|i| i.uuid == item.uuid)
            .ok_or_else(|| FolderError::NotFound(format!("item {}", item.uuid)))?;
        *existing = item;
        Ok(())
    }

    pub fn remove_item(&mut self, uuid: Uuid) -> FolderResult<FolderItem> {
        let position = self
            .items
            .iter()
            .position(|i| i.uuid == uuid)
            .ok_or_else(|| FolderError::NotFound(format!("item {uuid}")))?;
        Ok(self.items.remove(position))
    }

    pub fn has_item_of(&self, repository: &str) -> bool {
        self.items.iter().any(|i| i.repository == repository)
    }
}

/// Flags the keys of `owner` invalid across `folders`. Returns the folders
/// that changed.
pub fn invalidate_keys_of(folders: &mut [Folder], owner: Uuid) -> Vec<Uuid> {
    folders
        .iter_mut()
        .filter_map(|f| (f.invalidate_keys_of(owner) > 0).then_some(f.id))
        .collect()
}
