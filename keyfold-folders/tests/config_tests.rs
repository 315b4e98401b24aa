use keyfold_crypto::{AsymmetricEncryption, KdfParams, SymmetricEncryption};
use keyfold_folders::{
    DEFAULT_MAX_HIERARCHY_DEPTH, FolderError, FoldersConfig, RECORDS_REPOSITORY,
};
use pretty_assertions::assert_eq;

#[test]
fn default_config_values() {
    let config = FoldersConfig::default();
    assert_eq!(config.max_hierarchy_depth, DEFAULT_MAX_HIERARCHY_DEPTH);
    assert_eq!(config.max_hierarchy_depth, 64);
    assert_eq!(config.records_repository, RECORDS_REPOSITORY);
    assert_eq!(config.crypto.symmetric_versions, vec!["S1", "S2"]);
    assert_eq!(config.crypto.asymmetric_versions, vec!["A1"]);
    assert_eq!(config.crypto.kdf, KdfParams::default());
}

#[test]
fn empty_json_gives_defaults() {
    let config = FoldersConfig::from_json_str("{}").unwrap();
    assert_eq!(config, FoldersConfig::default());
}

#[test]
fn partial_json_overrides_fields() {
    let config =
        FoldersConfig::from_json_str(r#"{"max_hierarchy_depth": 8, "records_repository": "R"}"#)
            .unwrap();
    assert_eq!(config.max_hierarchy_depth, 8);
    assert_eq!(config.records_repository, "R");
    assert_eq!(config.crypto, FoldersConfig::default().crypto);
}

#[test]
fn config_serde_roundtrip() {
    let config = FoldersConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back = FoldersConfig::from_json_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn malformed_json_is_a_config_error() {
    assert!(matches!(
        FoldersConfig::from_json_str("not json"),
        Err(FolderError::Config(_))
    ));
}

#[test]
fn unknown_version_fails_registry_build() {
    let config = FoldersConfig::from_json_str(
        r#"{"crypto": {"symmetric_versions": ["S9"]}}"#,
    )
    .unwrap();
    assert!(matches!(config.registry(), Err(FolderError::Crypto(_))));
}

#[test]
fn default_registry_prefers_newest_versions() {
    let registry = FoldersConfig::default().registry().unwrap();
    assert_eq!(registry.get_highest_symmetric().unwrap().version(), "S2");
    assert_eq!(registry.get_highest_asymmetric().unwrap().version(), "A1");
}
