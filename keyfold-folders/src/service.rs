//! Folder use cases.
//!
//! Each use case loads the organization's folders from the repository, runs
//! one aggregate operation and persists the result. Per-folder mutations go
//! through [`FolderRepository::update`] and multi-folder ones through
//! [`FolderRepository::update_tree`], so both are serialized by the store.

use crate::config::FoldersConfig;
use crate::content::Content;
use crate::context::{GroupLookup, KeyContext};
use crate::error::{FolderError, FolderResult};
use crate::folder::{Folder, FolderItem};
use crate::principal::{Member, Principal};
use crate::repository::{FolderRepository, ItemRepository};
use crate::tree::FolderTree;
use keyfold_crypto::{EncryptionRegistry, OpenBox, SymmetricKey};
use tracing::{debug, info};
use uuid::Uuid;

pub struct FolderService<R: FolderRepository> {
    repository: R,
    registry: EncryptionRegistry,
    config: FoldersConfig,
}

fn require_access(folder: &Folder, actor: &dyn Member, ctx: &KeyContext<'_>) -> FolderResult<()> {
    if folder.has_access(actor, ctx) {
        Ok(())
    } else {
        Err(FolderError::NoKeyFound(actor.id()))
    }
}

impl<R: FolderRepository> FolderService<R> {
    pub fn new(repository: R, config: FoldersConfig) -> FolderResult<Self> {
        let registry = config.registry()?;
        Ok(Self {
            repository,
            registry,
            config,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn registry(&self) -> &EncryptionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FoldersConfig {
        &self.config
    }

    fn tree(&self, org_id: i64) -> FolderResult<FolderTree> {
        Ok(self
            .repository
            .tree(org_id)?
            .with_max_depth(self.config.max_hierarchy_depth))
    }

    /// Runs `f` on one folder under the repository's lock, with the rest of
    /// the organization's folders available for key resolution.
    fn update<T>(
        &self,
        org_id: i64,
        id: Uuid,
        groups: &dyn GroupLookup,
        f: impl FnOnce(&mut Folder, &KeyContext<'_>) -> FolderResult<T>,
    ) -> FolderResult<T> {
        let tree = self.tree(org_id)?;
        let ctx = tree.context(&self.registry, groups);
        self.repository.update(org_id, id, |folder| f(folder, &ctx))
    }

    // ========================================================================
    // Folders
    // ========================================================================

    /// Creates a folder holding a fresh key wrapped for `actor`, optionally
    /// below `parent`.
    pub fn create_folder(
        &self,
        actor: &dyn Member,
        name: &str,
        parent: Option<Uuid>,
        groups: &dyn GroupLookup,
    ) -> FolderResult<Folder> {
        let tree = self.tree(actor.org_id())?;
        let ctx = tree.context(&self.registry, groups);

        let mut folder = Folder::create(name, actor.org_id());
        folder.grant_access(actor, None, &ctx)?;
        if let Some(parent_id) = parent {
            let parent = tree.get(parent_id).ok_or(FolderError::FolderNotFound(parent_id))?;
            folder.set_parent(parent, actor, &ctx)?;
        }

        self.repository.save(&folder)?;
        info!("created folder {} for {}", folder.id(), actor.id());
        Ok(folder)
    }

    pub fn rename_folder(
        &self,
        actor: &dyn Member,
        id: Uuid,
        name: &str,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            folder.update_information(Some(name), false)
        })
    }

    /// Deletes an empty folder and the items other repositories filed into it.
    pub fn delete_folder(
        &self,
        actor: &dyn Member,
        id: Uuid,
        item_repositories: &[&dyn ItemRepository],
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        let tree = self.tree(actor.org_id())?;
        let ctx = tree.context(&self.registry, groups);
        let folder = tree.get(id).ok_or(FolderError::FolderNotFound(id))?;

        if !tree.children(id).is_empty() {
            return Err(FolderError::HasSubfolders(id));
        }
        if folder.has_item_of(&self.config.records_repository) {
            return Err(FolderError::ContainsRecords(id));
        }
        require_access(folder, actor, &ctx)?;

        self.repository.delete(folder, item_repositories)?;
        info!("deleted folder {id} by {}", actor.id());
        Ok(())
    }

    /// The folder key as seen by `actor`.
    pub fn folder_key(
        &self,
        actor: &dyn Member,
        id: Uuid,
        groups: &dyn GroupLookup,
    ) -> FolderResult<SymmetricKey> {
        let tree = self.tree(actor.org_id())?;
        let ctx = tree.context(&self.registry, groups);
        tree.get(id)
            .ok_or(FolderError::FolderNotFound(id))?
            .get_decryption_key(actor, &ctx)
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn grant_access(
        &self,
        actor: &dyn Member,
        id: Uuid,
        to: &dyn Member,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            folder.grant_access(to, Some(actor), ctx)
        })
    }

    pub fn grant_access_to_group(
        &self,
        actor: &dyn Member,
        id: Uuid,
        group: &dyn Principal,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            folder.grant_access_to_group(group, actor, ctx)
        })
    }

    pub fn revoke_access(
        &self,
        actor: &dyn Member,
        id: Uuid,
        of: &dyn Principal,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            folder.revoke_access(of)
        })
    }

    pub fn revoke_access_from_group(
        &self,
        actor: &dyn Member,
        id: Uuid,
        group: &dyn Principal,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            folder.revoke_access_from_group(group)
        })
    }

    pub fn toggle_inheritance(
        &self,
        actor: &dyn Member,
        id: Uuid,
        stop: bool,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            if stop {
                folder.stop_inheritance()
            } else {
                folder.allow_inheritance();
                Ok(())
            }
        })
    }

    // ========================================================================
    // Credential rotation
    // ========================================================================

    /// Flags every key of `user` invalid across the organization. Returns the
    /// number of folders that changed.
    pub fn invalidate_keys_of_user(&self, org_id: i64, user: Uuid) -> FolderResult<usize> {
        let changed = self
            .repository
            .update_tree(org_id, |tree| Ok(tree.invalidate_keys_of(user)))?;
        info!("invalidated keys of {user} in {} folders", changed.len());
        Ok(changed.len())
    }

    /// Re-wraps the invalid keys of `of` in every folder whose key `by` can
    /// resolve. Returns the number of folders fixed.
    pub fn correct_keys_of_user_by_user(
        &self,
        of: &dyn Member,
        by: &dyn Member,
        groups: &dyn GroupLookup,
    ) -> FolderResult<usize> {
        let max_depth = self.config.max_hierarchy_depth;
        let fixed = self.repository.update_tree(by.org_id(), |tree| {
            tree.set_max_depth(max_depth);
            let candidates: Vec<Uuid> = {
                let ctx = tree.context(&self.registry, groups);
                tree.folders()
                    .filter(|f| f.has_invalid_keys(of.id()) && f.resolve_key(by, &ctx).is_ok())
                    .map(Folder::id)
                    .collect()
            };
            for id in &candidates {
                tree.update(*id, &self.registry, groups, |folder, ctx| {
                    folder.fix_keys(of, by, ctx)
                })?;
            }
            Ok(candidates)
        })?;
        debug!("fixed keys of {} in {} folders by {}", of.id(), fixed.len(), by.id());
        Ok(fixed.len())
    }

    /// Runs [`Self::correct_keys_of_user_by_user`] for every user in `others`.
    pub fn correct_folder_keys_of_others(
        &self,
        by: &dyn Member,
        others: &[&dyn Member],
        groups: &dyn GroupLookup,
    ) -> FolderResult<usize> {
        let mut fixed = 0;
        for other in others.iter().filter(|o| o.id() != by.id()) {
            fixed += self.correct_keys_of_user_by_user(*other, by, groups)?;
        }
        info!("fixed {fixed} folder keys of others by {}", by.id());
        Ok(fixed)
    }

    /// Replaces a folder's key and re-wraps everything that depended on it.
    pub fn rotate_folder_key(
        &self,
        actor: &dyn Member,
        id: Uuid,
        holders: &[&dyn Principal],
        groups: &dyn GroupLookup,
    ) -> FolderResult<Vec<Uuid>> {
        let max_depth = self.config.max_hierarchy_depth;
        self.repository.update_tree(actor.org_id(), |tree| {
            tree.set_max_depth(max_depth);
            tree.rotate_key(id, actor, holders, &self.registry, groups)
        })
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    pub fn set_parent(
        &self,
        actor: &dyn Member,
        id: Uuid,
        parent: Uuid,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            let parent = ctx.folders.folder(parent).ok_or(FolderError::FolderNotFound(parent))?;
            folder.set_parent(parent, actor, ctx)
        })
    }

    pub fn move_folder(
        &self,
        actor: &dyn Member,
        id: Uuid,
        target: Uuid,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        if id == target {
            return Err(FolderError::WouldCreateCycle {
                folder: id,
                parent: target,
            });
        }
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            let target = ctx.folders.folder(target).ok_or(FolderError::FolderNotFound(target))?;
            folder.move_to(target, actor, ctx)
        })
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Files an item into the folder. A record restricts the folder.
    pub fn add_item_to_folder(
        &self,
        actor: &dyn Member,
        id: Uuid,
        item: FolderItem,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        let records = self.config.records_repository.as_str();
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            if item.repository == records {
                folder.restrict();
            }
            folder.add_item(item);
            Ok(())
        })
    }

    pub fn rename_item_in_folder(
        &self,
        actor: &dyn Member,
        id: Uuid,
        item: Uuid,
        name: &str,
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            let mut renamed = folder
                .items()
                .iter()
                .find(|i| i.uuid == item)
                .cloned()
                .ok_or_else(|| FolderError::NotFound(format!("item {item}")))?;
            renamed.name = name.to_string();
            folder.update_item(renamed)
        })
    }

    pub fn delete_item_from_folder(
        &self,
        actor: &dyn Member,
        id: Uuid,
        item: Uuid,
        groups: &dyn GroupLookup,
    ) -> FolderResult<FolderItem> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            folder.remove_item(item)
        })
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Seals `plaintext` under a fresh content key and stores it in the folder.
    pub fn store_content(
        &self,
        actor: &dyn Member,
        id: Uuid,
        name: &str,
        plaintext: &[u8],
        groups: &dyn GroupLookup,
    ) -> FolderResult<()> {
        let (content, key) = Content::seal(name, plaintext, &self.registry)?;
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            folder.add_content(content, &key, actor, ctx)
        })?;
        debug!("stored content '{name}' in folder {id}");
        Ok(())
    }

    pub fn read_content(
        &self,
        actor: &dyn Member,
        id: Uuid,
        name: &str,
        groups: &dyn GroupLookup,
    ) -> FolderResult<OpenBox> {
        let tree = self.tree(actor.org_id())?;
        let ctx = tree.context(&self.registry, groups);
        let folder = tree.get(id).ok_or(FolderError::FolderNotFound(id))?;
        let key = folder.get_content_key(name, actor, &ctx)?;
        folder.get_content(name)?.open(&key, &self.registry)
    }

    pub fn delete_content(
        &self,
        actor: &dyn Member,
        id: Uuid,
        name: &str,
        groups: &dyn GroupLookup,
    ) -> FolderResult<Content> {
        self.update(actor.org_id(), id, groups, |folder, ctx| {
            require_access(folder, actor, ctx)?;
            folder.delete_content(name)
        })
    }
}
