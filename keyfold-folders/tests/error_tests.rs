use keyfold_crypto::CryptoError;
use keyfold_folders::FolderError;
use uuid::Uuid;

#[test]
fn no_key_found_display() {
    let id = Uuid::nil();
    let err = FolderError::NoKeyFound(id);
    assert_eq!(err.to_string(), format!("no key found for principal {id}"));
}

#[test]
fn would_strand_display() {
    let id = Uuid::nil();
    let err = FolderError::WouldStrandFolder(id);
    assert_eq!(
        err.to_string(),
        format!("folder {id} would be left without a valid key")
    );
}

#[test]
fn inconsistent_version_display() {
    let owner = Uuid::nil();
    let err = FolderError::InconsistentEncryptionVersion {
        owner,
        versions: vec!["S1".into(), "S2".into()],
    };
    assert_eq!(
        err.to_string(),
        format!("keys of {owner} use different encryption versions: [\"S1\", \"S2\"]")
    );
}

#[test]
fn organization_mismatch_display() {
    let err = FolderError::OrganizationMismatch {
        expected: 1,
        found: 2,
    };
    assert_eq!(err.to_string(), "organization mismatch: expected 1, found 2");
}

#[test]
fn move_disabled_display() {
    assert_eq!(
        FolderError::MoveDisabled.to_string(),
        "moving folders is disabled in this build"
    );
}

#[test]
fn content_errors_display() {
    assert_eq!(
        FolderError::DuplicateName("doc".into()).to_string(),
        "content 'doc' already exists"
    );
    assert_eq!(
        FolderError::NotFound("content 'doc'".into()).to_string(),
        "not found: content 'doc'"
    );
}

#[test]
fn hierarchy_too_deep_display() {
    assert_eq!(
        FolderError::HierarchyTooDeep(64).to_string(),
        "folder hierarchy deeper than 64 levels"
    );
}

#[test]
fn from_crypto_error() {
    let err: FolderError = CryptoError::UnknownAlgorithmVersion("Z9".into()).into();
    assert!(matches!(err, FolderError::Crypto(_)));
    assert_eq!(err.to_string(), "crypto error: unknown encryption version 'Z9'");
}

#[test]
fn from_serde_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
    let err: FolderError = json_err.into();
    assert!(matches!(err, FolderError::Serialization(_)));
    assert!(err.to_string().starts_with("serialization error:"));
}

#[test]
fn config_display() {
    let err = FolderError::Config("max_hierarchy_depth must be at least 1".into());
    assert_eq!(
        err.to_string(),
        "invalid configuration: max_hierarchy_depth must be at least 1"
    );
}

#[test]
fn error_is_debug() {
    let err = FolderError::MissingPrincipal(Uuid::nil());
    let debug = format!("{err:?}");
    assert!(debug.contains("MissingPrincipal"));
}
