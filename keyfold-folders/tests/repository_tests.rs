//! In-memory folder repository.

mod support;

use keyfold_folders::{
    Folder, FolderError, FolderItem, FolderRepository, FolderResult, InMemoryFolderRepository,
    ItemRepository, KeyContext, NoGroups, Principal,
};
use pretty_assertions::assert_eq;
use std::sync::Mutex;
use support::{ORG, registry, root_folder, user};
use uuid::Uuid;

/// Records which folders it was asked to clear.
struct RecordingItems {
    name: &'static str,
    cleared: Mutex<Vec<Uuid>>,
}

impl RecordingItems {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            cleared: Mutex::new(Vec::new()),
        }
    }

    fn cleared(&self) -> Vec<Uuid> {
        self.cleared.lock().unwrap().clone()
    }
}

impl ItemRepository for RecordingItems {
    fn name(&self) -> &str {
        self.name
    }

    fn delete_items_of_folder(&self, folder: Uuid, _org_id: i64) -> FolderResult<()> {
        self.cleared.lock().unwrap().push(folder);
        Ok(())
    }
}

#[test]
fn save_and_retrieve() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let repository = InMemoryFolderRepository::new();
    let folder = root_folder("F", &alice, &registry);
    repository.save(&folder).unwrap();

    let loaded = repository.retrieve(ORG, folder.id()).unwrap();
    assert_eq!(loaded.name(), "F");
    assert_eq!(loaded.keys(), folder.keys());
    assert!(
        repository
            .raw_json(folder.id())
            .unwrap()
            .unwrap()
            .contains("\"type\":\"FOLDER\"")
    );
}

#[test]
fn other_organizations_do_not_see_folder() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let repository = InMemoryFolderRepository::new();
    let folder = root_folder("F", &alice, &registry);
    repository.save(&folder).unwrap();

    assert!(matches!(
        repository.retrieve(2, folder.id()),
        Err(FolderError::FolderNotFound(id)) if id == folder.id()
    ));
    assert!(repository.list(2).unwrap().is_empty());
    assert!(repository.list_by_ids(2, &[folder.id()]).unwrap().is_empty());
}

#[test]
fn list_and_list_by_ids() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let repository = InMemoryFolderRepository::new();
    let a = root_folder("A", &alice, &registry);
    let b = root_folder("B", &alice, &registry);
    let c = root_folder("C", &alice, &registry);
    repository.save_all(&[&a, &b, &c]).unwrap();

    let mut names: Vec<String> = repository
        .list(ORG)
        .unwrap()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["A", "B", "C"]);

    let picked = repository
        .list_by_ids(ORG, &[c.id(), Uuid::new_v4(), a.id()])
        .unwrap();
    let picked: Vec<Uuid> = picked.iter().map(Folder::id).collect();
    assert_eq!(picked, vec![c.id(), a.id()]);

    let tree = repository.tree(ORG).unwrap();
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.roots().len(), 3);
}

#[test]
fn delete_cascades_to_item_repositories_with_items() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let repository = InMemoryFolderRepository::new();
    let mut folder = root_folder("F", &alice, &registry);
    folder.add_item(FolderItem::new(Uuid::new_v4(), "scan.pdf", "FILES"));
    repository.save(&folder).unwrap();

    let files = RecordingItems::new("FILES");
    let messages = RecordingItems::new("MESSAGES");
    repository.delete(&folder, &[&files, &messages]).unwrap();

    assert_eq!(files.cleared(), vec![folder.id()]);
    assert!(messages.cleared().is_empty());
    assert!(matches!(
        repository.retrieve(ORG, folder.id()),
        Err(FolderError::FolderNotFound(_))
    ));
    assert!(matches!(
        repository.delete(&folder, &[]),
        Err(FolderError::FolderNotFound(_))
    ));
}

#[test]
fn failed_update_is_not_saved() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let bob = user(&registry, "bob");
    let repository = InMemoryFolderRepository::new();
    let folder = root_folder("F", &alice, &registry);
    repository.save(&folder).unwrap();
    let before = repository.raw_json(folder.id()).unwrap();

    let ctx = KeyContext::new(&registry);
    let err = repository
        .update(ORG, folder.id(), |f| {
            f.update_information(Some("renamed"), false)?;
            f.revoke_access(&alice)
        })
        .unwrap_err();
    assert!(matches!(err, FolderError::WouldStrandFolder(_)));
    assert_eq!(repository.raw_json(folder.id()).unwrap(), before);

    repository
        .update(ORG, folder.id(), |f| f.grant_access(&bob, Some(&alice), &ctx))
        .unwrap();
    let loaded = repository.retrieve(ORG, folder.id()).unwrap();
    assert!(loaded.has_direct_access(bob.id()));
}

#[test]
fn concurrent_grants_are_serialized() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let others: Vec<_> = (0..4).map(|i| user(&registry, &format!("u{i}"))).collect();
    let repository = InMemoryFolderRepository::new();
    let folder = root_folder("F", &alice, &registry);
    repository.save(&folder).unwrap();

    std::thread::scope(|scope| {
        for other in &others {
            let repository = repository.clone();
            let registry = &registry;
            let alice = &alice;
            let id = folder.id();
            scope.spawn(move || {
                let ctx = KeyContext::new(registry);
                repository
                    .update(ORG, id, |f| f.grant_access(other, Some(alice), &ctx))
                    .unwrap();
            });
        }
    });

    let loaded = repository.retrieve(ORG, folder.id()).unwrap();
    assert_eq!(loaded.keys().len(), 5);
    let ctx = KeyContext::new(&registry);
    let key = loaded.resolve_key(&alice, &ctx).unwrap();
    for other in &others {
        assert_eq!(loaded.resolve_key(other, &ctx).unwrap(), key);
    }
}

#[test]
fn tree_update_saves_only_returned_folders() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let bob = user(&registry, "bob");
    let repository = InMemoryFolderRepository::new();
    let a = root_folder("A", &alice, &registry);
    let b = root_folder("B", &alice, &registry);
    repository.save_all(&[&a, &b]).unwrap();

    let changed = repository
        .update_tree(ORG, |tree| {
            tree.update(a.id(), &registry, &NoGroups, |f, ctx| {
                f.grant_access(&bob, Some(&alice), ctx)
            })?;
            tree.update(b.id(), &registry, &NoGroups, |f, _| {
                f.update_information(Some("not saved"), false)
            })?;
            Ok(vec![a.id()])
        })
        .unwrap();

    assert_eq!(changed, vec![a.id()]);
    assert!(repository.retrieve(ORG, a.id()).unwrap().has_direct_access(bob.id()));
    assert_eq!(repository.retrieve(ORG, b.id()).unwrap().name(), "B");
}

#[test]
fn failed_tree_update_saves_nothing() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let repository = InMemoryFolderRepository::new();
    let folder = root_folder("F", &alice, &registry);
    repository.save(&folder).unwrap();
    let before = repository.raw_json(folder.id()).unwrap();

    let err = repository
        .update_tree(ORG, |tree| {
            tree.invalidate_keys_of(alice.id());
            Err(FolderError::Storage("disk full".to_string()))
        })
        .unwrap_err();
    assert!(matches!(err, FolderError::Storage(_)));
    assert_eq!(repository.raw_json(folder.id()).unwrap(), before);
}

#[test]
fn tree_updates_do_not_lose_concurrent_grants() {
    let registry = registry();
    let alice = user(&registry, "alice");
    let dave = user(&registry, "dave");
    let others: Vec<_> = (0..4).map(|i| user(&registry, &format!("u{i}"))).collect();
    let repository = InMemoryFolderRepository::new();
    let mut folder = root_folder("F", &alice, &registry);
    folder
        .grant_access(&dave, Some(&alice), &KeyContext::new(&registry))
        .unwrap();
    repository.save(&folder).unwrap();

    std::thread::scope(|scope| {
        for other in &others {
            let repository = repository.clone();
            let registry = &registry;
            let alice = &alice;
            let id = folder.id();
            scope.spawn(move || {
                let ctx = KeyContext::new(registry);
                repository
                    .update(ORG, id, |f| f.grant_access(other, Some(alice), &ctx))
                    .unwrap();
            });
        }
        let repository = repository.clone();
        let dave = dave.id();
        scope.spawn(move || {
            repository
                .update_tree(ORG, |tree| Ok(tree.invalidate_keys_of(dave)))
                .unwrap();
        });
    });

    let loaded = repository.retrieve(ORG, folder.id()).unwrap();
    assert_eq!(loaded.keys().len(), 6);
    assert!(loaded.has_invalid_keys(dave.id()));
    let ctx = KeyContext::new(&registry);
    for other in &others {
        assert!(loaded.resolve_key(other, &ctx).is_ok());
    }
}
