//! Shared fixtures for folder tests.
#![allow(dead_code)]

use keyfold_crypto::{EncryptionRegistry, OpenBox, SymmetricKey};
use keyfold_folders::{Folder, Group, KeyContext, Member, User};
use std::collections::HashMap;
use uuid::Uuid;

pub const ORG: i64 = 1;

pub fn registry() -> EncryptionRegistry {
    EncryptionRegistry::with_defaults()
}

pub fn user(registry: &EncryptionRegistry, name: &str) -> User {
    User::generate(ORG, name, registry).unwrap()
}

/// A root folder holding a fresh key wrapped for `owner`.
pub fn root_folder(name: &str, owner: &User, registry: &EncryptionRegistry) -> Folder {
    let mut folder = Folder::create(name, ORG);
    folder
        .grant_access(owner, None, &KeyContext::new(registry))
        .unwrap();
    folder
}

/// A group whose key is wrapped for every member. Members join the group.
pub fn group_of(
    name: &str,
    members: &mut [&mut User],
    registry: &EncryptionRegistry,
) -> Group {
    let mut group = Group::new(ORG, name);
    {
        let refs: Vec<&dyn Member> = members.iter().map(|m| &**m as &dyn Member).collect();
        group.generate_keys(&refs, registry).unwrap();
    }
    for member in members.iter_mut() {
        member.join_group(keyfold_folders::Principal::id(&group));
    }
    group
}

pub fn groups(list: Vec<Group>) -> HashMap<Uuid, Group> {
    list.into_iter()
        .map(|g| (keyfold_folders::Principal::id(&g), g))
        .collect()
}

/// Proves two keys are interchangeable by sealing with one and opening with the other.
pub fn assert_same_key(a: &SymmetricKey, b: &SymmetricKey, registry: &EncryptionRegistry) {
    let locked = a
        .lock(&OpenBox::new(b"same key".to_vec()), registry)
        .unwrap();
    assert_eq!(b.unlock(&locked, registry).unwrap().as_bytes(), b"same key");
}

/// Installs a test log writer. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
