use keyfold_crypto::{
    Algorithm, ChaCha20Poly1305V1, CryptoError, EncryptionRegistry, OpenBox, SymmetricKey,
    X25519SealedBoxV1, XChaCha20Poly1305V2,
};
use std::sync::Arc;

#[test]
fn empty_registry_has_no_highest() {
    let registry = EncryptionRegistry::new();
    assert!(matches!(
        registry.get_highest_symmetric(),
        Err(CryptoError::Config(_))
    ));
    assert!(matches!(
        registry.get_highest_asymmetric(),
        Err(CryptoError::Config(_))
    ));
}

#[test]
fn highest_is_most_recently_registered() {
    let mut registry = EncryptionRegistry::new();
    registry
        .add_symmetric_encryption(Arc::new(ChaCha20Poly1305V1))
        .unwrap();
    assert_eq!(registry.get_highest_symmetric().unwrap().version(), "S1");

    registry
        .add_symmetric_encryption(Arc::new(XChaCha20Poly1305V2))
        .unwrap();
    assert_eq!(registry.get_highest_symmetric().unwrap().version(), "S2");
}

#[test]
fn duplicate_version_is_rejected() {
    let mut registry = EncryptionRegistry::with_defaults();
    let err = registry
        .add_symmetric_encryption(Arc::new(ChaCha20Poly1305V1))
        .unwrap_err();
    assert!(matches!(err, CryptoError::DuplicateVersion(tag) if tag == "S1"));

    let err = registry
        .add_asymmetric_encryption(Arc::new(X25519SealedBoxV1))
        .unwrap_err();
    assert!(matches!(err, CryptoError::DuplicateVersion(tag) if tag == "A1"));
}

#[test]
fn unknown_version_is_rejected() {
    let registry = EncryptionRegistry::with_defaults();
    let err = registry.get_by_version("S9").unwrap_err();
    assert!(matches!(err, CryptoError::UnknownAlgorithmVersion(tag) if tag == "S9"));
}

#[test]
fn get_by_version_resolves_both_families() {
    let registry = EncryptionRegistry::with_defaults();
    assert!(matches!(
        registry.get_by_version("S1").unwrap(),
        Algorithm::Symmetric(_)
    ));
    assert!(matches!(
        registry.get_by_version("A1").unwrap(),
        Algorithm::Asymmetric(_)
    ));
}

#[test]
fn typed_lookup_of_wrong_family_is_a_mismatch() {
    let registry = EncryptionRegistry::with_defaults();
    assert!(matches!(
        registry.get_symmetric("A1"),
        Err(CryptoError::AlgorithmMismatch { .. })
    ));
    assert!(matches!(
        registry.get_asymmetric("S2"),
        Err(CryptoError::AlgorithmMismatch { .. })
    ));
}

#[test]
fn old_data_stays_readable_after_upgrade() {
    let mut registry = EncryptionRegistry::new();
    registry
        .add_symmetric_encryption(Arc::new(ChaCha20Poly1305V1))
        .unwrap();

    let old_key = SymmetricKey::generate(&registry).unwrap();
    assert_eq!(old_key.origin(), "S1");
    let old_box = old_key
        .lock(&OpenBox::new(b"written under S1".to_vec()), &registry)
        .unwrap();

    registry
        .add_symmetric_encryption(Arc::new(XChaCha20Poly1305V2))
        .unwrap();

    let new_key = SymmetricKey::generate(&registry).unwrap();
    assert_eq!(new_key.origin(), "S2");

    let opened = old_key.unlock(&old_box, &registry).unwrap();
    assert_eq!(opened.as_bytes(), b"written under S1");
}

#[test]
fn clones_are_isolated() {
    let base = EncryptionRegistry::new();
    let mut extended = base.clone();
    extended
        .add_symmetric_encryption(Arc::new(ChaCha20Poly1305V1))
        .unwrap();
    assert!(base.symmetric_versions().is_empty());
    assert_eq!(extended.symmetric_versions(), vec!["S1"]);
}
