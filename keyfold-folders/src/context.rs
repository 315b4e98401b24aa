//! Everything an aggregate operation needs besides the folder itself.

use crate::config::DEFAULT_MAX_HIERARCHY_DEPTH;
use crate::folder::Folder;
use crate::group::Group;
use crate::principal::Principal;
use keyfold_crypto::EncryptionRegistry;
use std::collections::HashMap;
use uuid::Uuid;

/// Finds groups a requestor belongs to.
pub trait GroupLookup {
    fn group(&self, id: Uuid) -> Option<&dyn Principal>;
}

/// Finds folders along a parent chain.
pub trait FolderLookup {
    fn folder(&self, id: Uuid) -> Option<&Folder>;
}

/// Lookup that knows no groups.
pub struct NoGroups;

/// Lookup that knows no folders.
pub struct NoFolders;

impl GroupLookup for NoGroups {
    fn group(&self, _id: Uuid) -> Option<&dyn Principal> {
        None
    }
}

impl FolderLookup for NoFolders {
    fn folder(&self, _id: Uuid) -> Option<&Folder> {
        None
    }
}

impl GroupLookup for HashMap<Uuid, Group> {
    fn group(&self, id: Uuid) -> Option<&dyn Principal> {
        self.get(&id).map(|g| g as &dyn Principal)
    }
}

impl GroupLookup for Vec<Group> {
    fn group(&self, id: Uuid) -> Option<&dyn Principal> {
        self.iter()
            .find(|g| g.id() == id)
            .map(|g| g as &dyn Principal)
    }
}

impl FolderLookup for HashMap<Uuid, Folder> {
    fn folder(&self, id: Uuid) -> Option<&Folder> {
        self.get(&id)
    }
}

impl FolderLookup for Vec<Folder> {
    fn folder(&self, id: Uuid) -> Option<&Folder> {
        self.iter().find(|f| f.id() == id)
    }
}

/// Registry plus lookups, passed by reference into aggregate operations.
#[derive(Clone, Copy)]
pub struct KeyContext<'a> {
    pub registry: &'a EncryptionRegistry,
    pub groups: &'a dyn GroupLookup,
    pub folders: &'a dyn FolderLookup,
    pub max_depth: usize,
}

impl<'a> KeyContext<'a> {
    /// A context without groups or other folders.
    pub fn new(registry: &'a EncryptionRegistry) -> Self {
        Self {
            registry,
            groups: &NoGroups,
            folders: &NoFolders,
            max_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
        }
    }

    pub fn with_groups(mut self, groups: &'a dyn GroupLookup) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_folders(mut self, folders: &'a dyn FolderLookup) -> Self {
        self.folders = folders;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
