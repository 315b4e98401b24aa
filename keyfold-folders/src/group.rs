//! Group principals.
//!
//! A group owns one shared symmetric key, wrapped individually for every
//! member the same way folder keys are wrapped for users. Folders wrap their
//! key under the group key, so any member with a valid copy reaches the folder.

use crate::error::{FolderError, FolderResult};
use crate::folder_key::{EncryptedGroupKeyOfMember, FolderKey};
use crate::principal::{Member, Principal};
use keyfold_crypto::{EncryptionRegistry, Key, SymmetricKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    id: Uuid,
    org_id: i64,
    name: String,
    #[serde(default)]
    members: Vec<Uuid>,
    #[serde(default)]
    keys: Vec<EncryptedGroupKeyOfMember>,
}

impl Group {
    pub fn new(org_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            members: Vec::new(),
            keys: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn org_id(&self) -> i64 {
        self.org_id
    }

    pub fn members(&self) -> &[Uuid] {
        &self.members
    }

    pub fn keys(&self) -> &[EncryptedGroupKeyOfMember] {
        &self.keys
    }

    pub fn has_member(&self, member: Uuid) -> bool {
        self.members.contains(&member)
    }

    pub fn has_keys(&self, member: Uuid) -> bool {
        self.keys.iter().any(|k| k.owner() == member)
    }

    pub fn has_valid_keys(&self, member: Uuid) -> bool {
        self.keys.iter().any(|k| k.owner() == member && k.is_valid())
    }

    /// Generates the group key and wraps it for every given member.
    pub fn generate_keys(
        &mut self,
        members: &[&dyn Member],
        registry: &EncryptionRegistry,
    ) -> FolderResult<()> {
        if !self.keys.is_empty() {
            return Err(FolderError::KeysAlreadyGenerated(self.id));
        }
        let group_key = FolderKey::new(self.id, SymmetricKey::generate(registry)?);

        let mut keys = Vec::with_capacity(members.len());
        let mut ids = Vec::with_capacity(members.len());
        for member in members {
            self.check_org(*member)?;
            if ids.contains(&member.id()) {
                return Err(FolderError::AlreadyAMember {
                    group: self.id,
                    member: member.id(),
                });
            }
            let lock_key = member.get_encryption_key(None, registry)?;
            keys.push(group_key.encrypt_for(member.id(), &lock_key, registry)?);
            ids.push(member.id());
        }

        self.members = ids;
        self.keys = keys;
        info!("generated keys of group {} for {} members", self.id, self.members.len());
        Ok(())
    }

    /// Adds a member. The first member receives a fresh group key; later
    /// members receive the key resolved through `by`.
    pub fn add_member(
        &mut self,
        new_member: &dyn Member,
        by: Option<&dyn Member>,
        registry: &EncryptionRegistry,
    ) -> FolderResult<()> {
        self.check_org(new_member)?;
        if self.has_member(new_member.id()) {
            return Err(FolderError::AlreadyAMember {
                group: self.id,
                member: new_member.id(),
            });
        }

        let group_key = if self.keys.is_empty() {
            FolderKey::new(self.id, SymmetricKey::generate(registry)?)
        } else {
            let by = by.ok_or(FolderError::NoKeyFound(new_member.id()))?;
            self.group_key(by, registry)?
        };
        let lock_key = new_member.get_encryption_key(None, registry)?;
        let entry = group_key.encrypt_for(new_member.id(), &lock_key, registry)?;

        self.keys.push(entry);
        self.members.push(new_member.id());
        info!("added member {} to group {}", new_member.id(), self.id);
        Ok(())
    }

    pub fn remove_member(&mut self, member: Uuid) -> FolderResult<()> {
        if !self.has_member(member) {
            return Err(FolderError::NotAMember {
                group: self.id,
                member,
            });
        }
        self.members.retain(|m| *m != member);
        self.keys.retain(|k| k.owner() != member);
        info!("removed member {member} from group {}", self.id);
        Ok(())
    }

    /// Marks the member's copy of the group key as unusable. Returns how
    /// many copies were flagged.
    pub fn invalidate_keys_of(&mut self, member: Uuid) -> usize {
        let mut count = 0;
        for key in self
            .keys
            .iter_mut()
            .filter(|k| k.owner() == member && k.is_valid())
        {
            key.invalidate();
            count += 1;
        }
        if count > 0 {
            debug!("invalidated {count} keys of {member} on group {}", self.id);
        }
        count
    }

    /// Re-wraps the group key for `of`, resolved through `by`.
    pub fn fix_keys(
        &mut self,
        of: &dyn Member,
        by: &dyn Member,
        registry: &EncryptionRegistry,
    ) -> FolderResult<()> {
        if !self.has_member(of.id()) {
            return Err(FolderError::NotAMember {
                group: self.id,
                member: of.id(),
            });
        }
        if self.has_valid_keys(of.id()) {
            return Err(FolderError::NothingToFix(of.id()));
        }
        let group_key = self.group_key(by, registry)?;
        let lock_key = of.get_encryption_key(None, registry)?;
        let entry = group_key.encrypt_for(of.id(), &lock_key, registry)?;

        self.keys.retain(|k| k.owner() != of.id());
        self.keys.push(entry);
        info!("fixed keys of {} on group {} by {}", of.id(), self.id, by.id());
        Ok(())
    }

    fn check_org(&self, member: &dyn Member) -> FolderResult<()> {
        if member.org_id() != self.org_id {
            return Err(FolderError::OrganizationMismatch {
                expected: self.org_id,
                found: member.org_id(),
            });
        }
        Ok(())
    }

    fn group_key(&self, member: &dyn Member, registry: &EncryptionRegistry) -> FolderResult<FolderKey> {
        let entry = self
            .keys
            .iter()
            .find(|k| k.owner() == member.id())
            .ok_or(FolderError::NotAMember {
                group: self.id,
                member: member.id(),
            })?;
        if !entry.is_valid() {
            return Err(FolderError::KeysNeedRepair(member.id()));
        }
        let unlock_key = member.get_decryption_key(member, registry)?;
        entry.decrypt(&unlock_key, registry)
    }
}

impl Principal for Group {
    fn id(&self) -> Uuid {
        self.id
    }

    fn get_encryption_key(
        &self,
        requestor: Option<&dyn Member>,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Key> {
        let requestor = requestor.ok_or(FolderError::NoKeyFound(self.id))?;
        Ok(Key::Symmetric(self.group_key(requestor, registry)?.into_key()))
    }

    fn get_decryption_key(
        &self,
        requestor: &dyn Member,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Key> {
        Ok(Key::Symmetric(self.group_key(requestor, registry)?.into_key()))
    }
}
