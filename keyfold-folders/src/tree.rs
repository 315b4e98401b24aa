//! Folder hierarchy held as an arena indexed by folder id.

use crate::config::DEFAULT_MAX_HIERARCHY_DEPTH;
use crate::context::{FolderLookup, GroupLookup, KeyContext};
use crate::error::{FolderError, FolderResult};
use crate::folder::Folder;
use crate::principal::{Member, Principal};
use keyfold_crypto::EncryptionRegistry;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// All folders of one organization.
///
/// Parent links are ids into the arena and every walk is bounded by
/// `max_depth`. Mutations run on a copy of the affected folders and are only
/// written back when they succeed.
#[derive(Clone, Debug)]
pub struct FolderTree {
    folders: HashMap<Uuid, Folder>,
    max_depth: usize,
}

impl Default for FolderTree {
    fn default() -> Self {
        Self {
            folders: HashMap::new(),
            max_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
        }
    }
}

impl FolderLookup for FolderTree {
    fn folder(&self, id: Uuid) -> Option<&Folder> {
        self.folders.get(&id)
    }
}

impl FromIterator<Folder> for FolderTree {
    fn from_iter<I: IntoIterator<Item = Folder>>(iter: I) -> Self {
        let mut tree = Self::default();
        for folder in iter {
            tree.insert(folder);
        }
        tree
    }
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Inserts or replaces a folder.
    pub fn insert(&mut self, folder: Folder) -> Option<Folder> {
        self.folders.insert(folder.id(), folder)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Folder> {
        self.folders.remove(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Folder> {
        self.folders.get(&id)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    /// A key context whose folder lookup is this tree.
    pub fn context<'a>(
        &'a self,
        registry: &'a EncryptionRegistry,
        groups: &'a dyn GroupLookup,
    ) -> KeyContext<'a> {
        KeyContext::new(registry)
            .with_groups(groups)
            .with_folders(self)
            .with_max_depth(self.max_depth)
    }

    fn sorted(mut folders: Vec<&Folder>) -> Vec<&Folder> {
        folders.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        folders
    }

    /// Direct subfolders, ordered by name.
    pub fn children(&self, id: Uuid) -> Vec<&Folder> {
        Self::sorted(
            self.folders
                .values()
                .filter(|f| f.parent() == Some(id))
                .collect(),
        )
    }

    /// Folders without a parent in this tree, ordered by name.
    pub fn roots(&self) -> Vec<&Folder> {
        Self::sorted(
            self.folders
                .values()
                .filter(|f| f.parent().is_none_or(|p| !self.folders.contains_key(&p)))
                .collect(),
        )
    }

    /// Parent ids from the direct parent up to the root.
    pub fn ancestors(&self, id: Uuid) -> FolderResult<Vec<Uuid>> {
        let mut current = self.get(id).ok_or(FolderError::FolderNotFound(id))?;
        let mut ancestors = Vec::new();
        while let Some(parent_id) = current.parent() {
            if ancestors.len() >= self.max_depth || parent_id == id {
                return Err(FolderError::HierarchyTooDeep(self.max_depth));
            }
            ancestors.push(parent_id);
            match self.get(parent_id) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(ancestors)
    }

    /// Whether `candidate` lies somewhere below `ancestor`.
    pub fn is_descendant(&self, candidate: Uuid, ancestor: Uuid) -> FolderResult<bool> {
        Ok(self.ancestors(candidate)?.contains(&ancestor))
    }

    /// Owners of direct keys (users and groups) of the folder, followed by
    /// the owners it inherits from its ancestors until inheritance stops.
    pub fn owners_with_access(&self, id: Uuid) -> FolderResult<Vec<Uuid>> {
        let mut current = self.get(id).ok_or(FolderError::FolderNotFound(id))?;
        let mut owners: Vec<Uuid> = Vec::new();
        for _ in 0..=self.max_depth {
            let direct = current
                .keys()
                .iter()
                .map(|k| k.owner())
                .chain(current.group_keys().iter().map(|k| k.owner()));
            for owner in direct {
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
            }
            if current.stop_inherit() || current.parent_key().is_none() {
                return Ok(owners);
            }
            match current.parent().and_then(|p| self.get(p)) {
                Some(parent) => current = parent,
                None => return Ok(owners),
            }
        }
        Err(FolderError::HierarchyTooDeep(self.max_depth))
    }

    /// Runs `f` on a copy of the folder and stores the copy if `f` succeeds.
    pub fn update<R>(
        &mut self,
        id: Uuid,
        registry: &EncryptionRegistry,
        groups: &dyn GroupLookup,
        f: impl FnOnce(&mut Folder, &KeyContext<'_>) -> FolderResult<R>,
    ) -> FolderResult<R> {
        let mut folder = self.get(id).ok_or(FolderError::FolderNotFound(id))?.clone();
        let result = {
            let ctx = self.context(registry, groups);
            f(&mut folder, &ctx)?
        };
        self.folders.insert(id, folder);
        Ok(result)
    }

    pub fn set_parent(
        &mut self,
        id: Uuid,
        parent_id: Uuid,
        by: &dyn Member,
        registry: &EncryptionRegistry,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        if id == parent_id {
            return Err(FolderError::WouldCreateCycle {
                folder: id,
                parent: parent_id,
            });
        }
        self.update(id, registry, groups, |folder, ctx| {
            let parent = ctx
                .folders
                .folder(parent_id)
                .ok_or(FolderError::FolderNotFound(parent_id))?;
            folder.set_parent(parent, by, ctx)
        })
    }

    pub fn move_folder(
        &mut self,
        id: Uuid,
        target_id: Uuid,
        by: &dyn Member,
        registry: &EncryptionRegistry,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        if id == target_id {
            return Err(FolderError::WouldCreateCycle {
                folder: id,
                parent: target_id,
            });
        }
        self.update(id, registry, groups, |folder, ctx| {
            let target = ctx
                .folders
                .folder(target_id)
                .ok_or(FolderError::FolderNotFound(target_id))?;
            folder.move_to(target, by, ctx)
        })
    }

    /// Flags the keys of `owner` invalid in every folder. Returns the folders
    /// that changed.
    pub fn invalidate_keys_of(&mut self, owner: Uuid) -> Vec<Uuid> {
        self.folders
            .values_mut()
            .filter_map(|f| (f.invalidate_keys_of(owner) > 0).then_some(f.id()))
            .collect()
    }

    /// Rotates a folder's key and re-wraps the parent keys of its children.
    /// Returns the ids of every folder that changed.
    pub fn rotate_key(
        &mut self,
        id: Uuid,
        by: &dyn Member,
        holders: &[&dyn Principal],
        registry: &EncryptionRegistry,
        groups: &dyn GroupLookup,
    ) -> FolderResult<Vec<Uuid>> {
        let (folder, children) = {
            let ctx = self.context(registry, groups);
            let mut folder = self.get(id).ok_or(FolderError::FolderNotFound(id))?.clone();
            let (old_key, new_key) = folder.rotate_key(by, holders, &ctx)?;

            let mut children: Vec<Folder> = self.children(id).into_iter().cloned().collect();
            for child in &mut children {
                child.rewrap_parent_key(&old_key, &new_key, &ctx)?;
            }
            (folder, children)
        };

        let mut changed = vec![folder.id()];
        self.folders.insert(id, folder);
        for child in children {
            changed.push(child.id());
            self.folders.insert(child.id(), child);
        }
        info!("rotated key of folder {id}, {} folders changed", changed.len());
        Ok(changed)
    }
}
