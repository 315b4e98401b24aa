//! The capabilities a user or group needs to hold folder keys.

use crate::error::FolderResult;
use keyfold_crypto::{EncryptionRegistry, Key};
use uuid::Uuid;

/// Anything a folder key can be wrapped for.
pub trait Principal {
    fn id(&self) -> Uuid;

    /// The key folder keys are wrapped under for this principal.
    ///
    /// Users answer without a requestor. Groups only hand out their shared key
    /// to a member holding a valid copy of it.
    fn get_encryption_key(
        &self,
        requestor: Option<&dyn Member>,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Key>;

    /// The key that unwraps what [`Principal::get_encryption_key`] wrapped,
    /// on behalf of `requestor`.
    fn get_decryption_key(
        &self,
        requestor: &dyn Member,
        registry: &EncryptionRegistry,
    ) -> FolderResult<Key>;
}

/// A principal that can request keys itself and belong to groups.
pub trait Member: Principal {
    fn org_id(&self) -> i64;

    fn group_memberships(&self) -> Vec<Uuid>;
}
