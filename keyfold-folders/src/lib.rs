//! Hierarchical folder encryption and access control for keyfold.
//!
//! Provides:
//! - Per-folder symmetric keys wrapped individually for users and groups
//! - Key inheritance along the folder hierarchy through parent keys
//! - Grant, revoke, invalidation and repair of wrapped keys
//! - Content sealed under per-content keys wrapped by the folder key
//! - A repository contract with an in-memory implementation
//!
//! All aggregate operations are synchronous. Atomicity and serialization of
//! concurrent updates belong to the repository.

pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod folder;
pub mod folder_key;
pub mod group;
pub mod principal;
pub mod repository;
pub mod service;
pub mod tree;
pub mod user;

pub use config::{DEFAULT_MAX_HIERARCHY_DEPTH, FoldersConfig, RECORDS_REPOSITORY};
pub use content::Content;
pub use context::{FolderLookup, GroupLookup, KeyContext, NoFolders, NoGroups};
pub use error::{FolderError, FolderResult};
pub use folder::{Folder, FolderItem, invalidate_keys_of};
pub use folder_key::{
    EncryptedFolderKeyOfGroup, EncryptedFolderKeyOfUser, EncryptedGroupKeyOfMember,
    EncryptedKeyOf, FolderKey, KeyKind, OfGroup, OfParent, OfUser, ParentKey,
};
pub use group::Group;
pub use principal::{Member, Principal};
pub use repository::{FolderRepository, InMemoryFolderRepository, ItemRepository};
pub use service::FolderService;
pub use tree::FolderTree;
pub use user::{SealedKeyPair, User};
