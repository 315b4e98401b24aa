//! Folder persistence contract and an in-memory implementation.
//!
//! The aggregate performs no locking. A repository saves a folder's key list
//! and any parent key changes as one unit, and serializes load-mutate-save
//! cycles on the same folder. Changes spanning several folders go through
//! [`FolderRepository::update_tree`], which holds the organization's folders
//! for the whole cycle.

use crate::error::{FolderError, FolderResult};
use crate::folder::Folder;
use crate::tree::FolderTree;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A repository holding items filed into folders (records, files, messages).
pub trait ItemRepository {
    /// Repository name stored in [`crate::FolderItem::repository`].
    fn name(&self) -> &str;

    /// Deletes every item of this repository that lives in `folder`.
    fn delete_items_of_folder(&self, folder: Uuid, org_id: i64) -> FolderResult<()>;
}

pub trait FolderRepository {
    fn retrieve(&self, org_id: i64, id: Uuid) -> FolderResult<Folder>;

    fn save(&self, folder: &Folder) -> FolderResult<()>;

    /// Saves several folders as one unit.
    fn save_all(&self, folders: &[&Folder]) -> FolderResult<()>;

    fn list(&self, org_id: i64) -> FolderResult<Vec<Folder>>;

    fn list_by_ids(&self, org_id: i64, ids: &[Uuid]) -> FolderResult<Vec<Folder>>;

    /// Deletes the folder after asking every item repository to delete the
    /// items it holds in it.
    fn delete(&self, folder: &Folder, item_repositories: &[&dyn ItemRepository]) -> FolderResult<()>;

    /// Loads, mutates and saves one folder while holding the folder's lock.
    /// Nothing is saved if `f` fails.
    fn update<R>(
        &self,
        org_id: i64,
        id: Uuid,
        f: impl FnOnce(&mut Folder) -> FolderResult<R>,
    ) -> FolderResult<R>
    where
        Self: Sized;

    /// Loads every folder of the organization, lets `f` mutate the arena and
    /// saves the folders whose ids `f` returns, all under one lock. Nothing
    /// is saved if `f` fails.
    fn update_tree(
        &self,
        org_id: i64,
        f: impl FnOnce(&mut FolderTree) -> FolderResult<Vec<Uuid>>,
    ) -> FolderResult<Vec<Uuid>>
    where
        Self: Sized;

    /// All folders of the organization as an arena.
    fn tree(&self, org_id: i64) -> FolderResult<FolderTree> {
        Ok(self.list(org_id)?.into_iter().collect())
    }
}

struct StoredFolder {
    org_id: i64,
    data_json: String,
}

/// Folders kept in memory in their JSON wire format.
///
/// A single lock guards the whole map, which satisfies both the atomicity and
/// the serialization requirement.
#[derive(Clone, Default)]
pub struct InMemoryFolderRepository {
    folders: Arc<Mutex<HashMap<Uuid, StoredFolder>>>,
}

impl InMemoryFolderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> FolderResult<MutexGuard<'_, HashMap<Uuid, StoredFolder>>> {
        self.folders
            .lock()
            .map_err(|_| FolderError::Storage("folder store lock poisoned".to_string()))
    }

    fn load(map: &HashMap<Uuid, StoredFolder>, org_id: i64, id: Uuid) -> FolderResult<Folder> {
        match map.get(&id) {
            Some(stored) if stored.org_id == org_id => Ok(serde_json::from_str(&stored.data_json)?),
            _ => Err(FolderError::FolderNotFound(id)),
        }
    }

    fn load_org(map: &HashMap<Uuid, StoredFolder>, org_id: i64) -> FolderResult<Vec<Folder>> {
        map.values()
            .filter(|s| s.org_id == org_id)
            .map(|s| serde_json::from_str(&s.data_json).map_err(FolderError::from))
            .collect()
    }

    fn store(map: &mut HashMap<Uuid, StoredFolder>, folder: &Folder) -> FolderResult<()> {
        let data_json = serde_json::to_string(folder)?;
        map.insert(
            folder.id(),
            StoredFolder {
                org_id: folder.org_id(),
                data_json,
            },
        );
        Ok(())
    }

    /// The persisted JSON of a folder.
    pub fn raw_json(&self, id: Uuid) -> FolderResult<Option<String>> {
        Ok(self.lock()?.get(&id).map(|s| s.data_json.clone()))
    }
}

impl FolderRepository for InMemoryFolderRepository {
    fn retrieve(&self, org_id: i64, id: Uuid) -> FolderResult<Folder> {
        let map = self.lock()?;
        Self::load(&map, org_id, id)
    }

    fn save(&self, folder: &Folder) -> FolderResult<()> {
        let mut map = self.lock()?;
        Self::store(&mut map, folder)?;
        debug!("saved folder {}", folder.id());
        Ok(())
    }

    fn save_all(&self, folders: &[&Folder]) -> FolderResult<()> {
        let encoded = folders
            .iter()
            .map(|f| -> FolderResult<(Uuid, i64, String)> {
                Ok((f.id(), f.org_id(), serde_json::to_string(f)?))
            })
            .collect::<FolderResult<Vec<_>>>()?;

        let mut map = self.lock()?;
        for (id, org_id, data_json) in encoded {
            map.insert(id, StoredFolder { org_id, data_json });
        }
        debug!("saved {} folders", folders.len());
        Ok(())
    }

    fn list(&self, org_id: i64) -> FolderResult<Vec<Folder>> {
        let map = self.lock()?;
        Self::load_org(&map, org_id)
    }

    fn list_by_ids(&self, org_id: i64, ids: &[Uuid]) -> FolderResult<Vec<Folder>> {
        let map = self.lock()?;
        ids.iter()
            .filter(|id| map.get(*id).is_some_and(|s| s.org_id == org_id))
            .map(|id| Self::load(&map, org_id, *id))
            .collect()
    }

    fn delete(&self, folder: &Folder, item_repositories: &[&dyn ItemRepository]) -> FolderResult<()> {
        let mut map = self.lock()?;
        if !map.contains_key(&folder.id()) {
            return Err(FolderError::FolderNotFound(folder.id()));
        }
        for repository in item_repositories {
            if folder.has_item_of(repository.name()) {
                repository.delete_items_of_folder(folder.id(), folder.org_id())?;
            }
        }
        map.remove(&folder.id());
        debug!("deleted folder {}", folder.id());
        Ok(())
    }

    fn update<R>(
        &self,
        org_id: i64,
        id: Uuid,
        f: impl FnOnce(&mut Folder) -> FolderResult<R>,
    ) -> FolderResult<R> {
        let mut map = self.lock()?;
        let mut folder = Self::load(&map, org_id, id)?;
        let result = f(&mut folder)?;
        Self::store(&mut map, &folder)?;
        Ok(result)
    }

    fn update_tree(
        &self,
        org_id: i64,
        f: impl FnOnce(&mut FolderTree) -> FolderResult<Vec<Uuid>>,
    ) -> FolderResult<Vec<Uuid>> {
        let mut map = self.lock()?;
        let mut tree: FolderTree = Self::load_org(&map, org_id)?.into_iter().collect();
        let changed = f(&mut tree)?;

        let encoded = changed
            .iter()
            .filter_map(|id| tree.get(*id))
            .map(|folder| -> FolderResult<(Uuid, String)> {
                Ok((folder.id(), serde_json::to_string(folder)?))
            })
            .collect::<FolderResult<Vec<_>>>()?;
        for (id, data_json) in encoded {
            map.insert(id, StoredFolder { org_id, data_json });
        }
        debug!("saved {} folders of organization {org_id}", changed.len());
        Ok(changed)
    }
}
