//! Folder domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Result type for folder operations.
pub type FolderResult<T> = Result<T, FolderError>;

/// Errors raised by the folder aggregate, principals and repositories.
///
/// Every failing aggregate operation leaves the aggregate unchanged.
#[derive(Debug, Error)]
pub enum FolderError {
    #[error("no key found for principal {0}")]
    NoKeyFound(Uuid),

    #[error("principal {0} already has access")]
    AlreadyHasAccess(Uuid),

    #[error("principal {0} has no direct access")]
    NoDirectAccess(Uuid),

    #[error("folder {0} would be left without a valid key")]
    WouldStrandFolder(Uuid),

    #[error("principal {0} has no invalid key to fix")]
    NothingToFix(Uuid),

    #[error("principal {0} holds an invalid key that has to be fixed first")]
    KeysNeedRepair(Uuid),

    #[error("keys of {owner} use different encryption versions: {versions:?}")]
    InconsistentEncryptionVersion { owner: Uuid, versions: Vec<String> },

    #[error("folder {0} already has a parent")]
    ParentAlreadySet(Uuid),

    #[error("folder {0} is restricted and can not receive subfolders")]
    ParentRestricted(Uuid),

    #[error("folder {parent} is {folder} or one of its subfolders")]
    WouldCreateCycle { folder: Uuid, parent: Uuid },

    #[error("organization mismatch: expected {expected}, found {found}")]
    OrganizationMismatch { expected: i64, found: i64 },

    #[error("moving folders is disabled in this build")]
    MoveDisabled,

    #[error("folder {0} is restricted and can not be renamed")]
    NameLocked(Uuid),

    #[error("content '{0}' already exists")]
    DuplicateName(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("folder {0} not found")]
    FolderNotFound(Uuid),

    #[error("folder hierarchy deeper than {0} levels")]
    HierarchyTooDeep(usize),

    #[error("principal {0} was not supplied")]
    MissingPrincipal(Uuid),

    #[error("principal {0} is locked")]
    PrincipalLocked(Uuid),

    #[error("{member} is not a member of group {group}")]
    NotAMember { group: Uuid, member: Uuid },

    #[error("{member} is already a member of group {group}")]
    AlreadyAMember { group: Uuid, member: Uuid },

    #[error("keys of group {0} have already been generated")]
    KeysAlreadyGenerated(Uuid),

    #[error("folder {0} has subfolders")]
    HasSubfolders(Uuid),

    #[error("folder {0} contains records")]
    ContainsRecords(Uuid),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] keyfold_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
