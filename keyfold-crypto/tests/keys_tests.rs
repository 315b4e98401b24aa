use keyfold_crypto::{
    AsymmetricKey, CryptoError, EncryptedAsymmetricKey, EncryptedSymmetricKey,
    EncryptionRegistry, KdfParams, Key, LockedBox, OpenBox, Salt, SymmetricKey,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn registry() -> EncryptionRegistry {
    EncryptionRegistry::with_defaults()
}

#[test]
fn symmetric_lock_unlock() {
    let registry = registry();
    let key = SymmetricKey::generate(&registry).unwrap();
    let locked = key
        .lock(&OpenBox::new(b"hello folder".to_vec()), &registry)
        .unwrap();
    assert_eq!(locked.key_origin, "S2");
    assert_eq!(
        key.unlock(&locked, &registry).unwrap().as_bytes(),
        b"hello folder"
    );
}

#[test]
fn unlock_rejects_box_with_other_tag() {
    let registry = registry();
    let key = SymmetricKey::generate(&registry).unwrap();
    let mut locked = key.lock(&OpenBox::new(b"x".to_vec()), &registry).unwrap();
    locked.key_origin = "S1".to_string();

    let err = key.unlock(&locked, &registry).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::AlgorithmMismatch { ref key, ref found } if key == "S2" && found == "S1"
    ));
}

#[test]
fn wrong_symmetric_key_fails() {
    let registry = registry();
    let a = SymmetricKey::generate(&registry).unwrap();
    let b = SymmetricKey::generate(&registry).unwrap();
    let locked = a.lock(&OpenBox::new(b"x".to_vec()), &registry).unwrap();
    assert!(matches!(
        b.unlock(&locked, &registry),
        Err(CryptoError::Decryption(_))
    ));
}

#[test]
fn asymmetric_lock_unlock() {
    let registry = registry();
    let pair = AsymmetricKey::generate(&registry).unwrap();
    let locked = pair.lock(&OpenBox::new(b"sealed".to_vec()), &registry).unwrap();
    assert_eq!(locked.key_origin, "A1");
    assert_eq!(pair.unlock(&locked, &registry).unwrap().as_bytes(), b"sealed");
}

#[test]
fn symmetric_key_wrapped_under_asymmetric() {
    let registry = registry();
    let folder_key = SymmetricKey::generate(&registry).unwrap();
    let user = AsymmetricKey::generate(&registry).unwrap();

    let wrapped =
        EncryptedSymmetricKey::create(&folder_key, &Key::from(user.clone()), &registry).unwrap();
    assert_eq!(wrapped.origin, "S2");
    assert_eq!(wrapped.wrapped_by(), "A1");

    let unwrapped = wrapped.decrypt(&Key::from(user), &registry).unwrap();
    assert_eq!(unwrapped, folder_key);
}

#[test]
fn encrypted_asymmetric_key_locks_through_public_half() {
    let registry = registry();
    let pair = AsymmetricKey::generate(&registry).unwrap();
    let password_key = SymmetricKey::derive_from_password(
        "correct horse",
        &Salt::random(),
        &KdfParams::insecure_fast(),
        &registry,
    )
    .unwrap();
    let sealed_pair =
        EncryptedAsymmetricKey::create(&pair, &Key::from(password_key.clone()), &registry)
            .unwrap();

    let folder_key = SymmetricKey::generate(&registry).unwrap();
    let wrapped = EncryptedSymmetricKey::create(
        &folder_key,
        &Key::from(sealed_pair.clone()),
        &registry,
    )
    .unwrap();

    let recovered_pair = sealed_pair
        .decrypt(&Key::from(password_key), &registry)
        .unwrap();
    assert_eq!(recovered_pair, pair);
    let unwrapped = wrapped
        .decrypt(&Key::from(recovered_pair), &registry)
        .unwrap();
    assert_eq!(unwrapped, folder_key);
}

#[test]
fn asymmetric_key_wrapped_under_asymmetric_uses_intermediate() {
    let registry = registry();
    let inner = AsymmetricKey::generate(&registry).unwrap();
    let outer = AsymmetricKey::generate(&registry).unwrap();

    let wrapped =
        EncryptedAsymmetricKey::create(&inner, &Key::from(outer.clone()), &registry).unwrap();
    assert!(wrapped.enc_key.is_some());
    assert_eq!(wrapped.decrypt(&Key::from(outer), &registry).unwrap(), inner);
}

#[test]
fn encrypted_symmetric_key_is_not_directly_usable() {
    let registry = registry();
    let key = SymmetricKey::generate(&registry).unwrap();
    let wrap = Key::from(SymmetricKey::generate(&registry).unwrap());
    let wrapped = Key::from(EncryptedSymmetricKey::create(&key, &wrap, &registry).unwrap());

    let open = OpenBox::new(b"data".to_vec());
    assert!(matches!(
        wrapped.lock(&open, &registry),
        Err(CryptoError::NotDirectlyUsable("lock"))
    ));
    let locked = LockedBox::new(vec![0; 40], "S2");
    assert!(matches!(
        wrapped.unlock(&locked, &registry),
        Err(CryptoError::NotDirectlyUsable("unlock"))
    ));
}

#[test]
fn encrypted_asymmetric_key_can_not_unlock() {
    let registry = registry();
    let pair = AsymmetricKey::generate(&registry).unwrap();
    let wrap = Key::from(SymmetricKey::generate(&registry).unwrap());
    let wrapped = Key::from(EncryptedAsymmetricKey::create(&pair, &wrap, &registry).unwrap());

    let locked = wrapped
        .lock(&OpenBox::new(b"still lockable".to_vec()), &registry)
        .unwrap();
    assert!(matches!(
        wrapped.unlock(&locked, &registry),
        Err(CryptoError::NotDirectlyUsable("unlock"))
    ));
    assert_eq!(
        Key::from(pair).unlock(&locked, &registry).unwrap().as_bytes(),
        b"still lockable"
    );
}

#[test]
fn password_derivation_is_deterministic_per_salt() {
    let registry = registry();
    let salt = Salt::random();
    let params = KdfParams::insecure_fast();
    let a = SymmetricKey::derive_from_password("pw", &salt, &params, &registry).unwrap();
    let b = SymmetricKey::derive_from_password("pw", &salt, &params, &registry).unwrap();
    let c = SymmetricKey::derive_from_password("other", &salt, &params, &registry).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn locked_box_wire_format() {
    let locked = LockedBox::new(vec![1, 2, 3, 4], "S1");
    let json = serde_json::to_value(&locked).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"enc_data": "AQIDBA==", "key_origin": "S1"})
    );
}

#[test]
fn encrypted_symmetric_key_wire_format() {
    let wrapped = EncryptedSymmetricKey {
        enc_key: LockedBox::new(vec![0xff; 3], "A1"),
        origin: "S2".to_string(),
    };
    let json = serde_json::to_value(&wrapped).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "enc_key": {"enc_data": "////", "key_origin": "A1"},
            "origin": "S2"
        })
    );
    let back: EncryptedSymmetricKey = serde_json::from_value(json).unwrap();
    assert_eq!(back, wrapped);
}

#[test]
fn persisted_wrapped_key_still_decrypts() {
    let registry = registry();
    let key = SymmetricKey::generate(&registry).unwrap();
    let owner = AsymmetricKey::generate(&registry).unwrap();
    let wrapped = EncryptedSymmetricKey::create(&key, &Key::from(owner.clone()), &registry).unwrap();

    let json = serde_json::to_string(&wrapped).unwrap();
    let restored: EncryptedSymmetricKey = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.decrypt(&Key::from(owner), &registry).unwrap(), key);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn wrapped_key_decrypts_to_original(material in proptest::collection::vec(any::<u8>(), 32), asymmetric in any::<bool>()) {
        let registry = registry();
        let original = SymmetricKey::from_bytes(material, "S1");
        let (wrap, unwrap) = if asymmetric {
            let pair = AsymmetricKey::generate(&registry).unwrap();
            (Key::from(pair.clone()), Key::from(pair))
        } else {
            let k = SymmetricKey::generate(&registry).unwrap();
            (Key::from(k.clone()), Key::from(k))
        };
        let wrapped = EncryptedSymmetricKey::create(&original, &wrap, &registry).unwrap();
        let recovered = wrapped.decrypt(&unwrap, &registry).unwrap();
        prop_assert_eq!(recovered.as_bytes(), original.as_bytes());
        prop_assert_eq!(recovered.origin(), "S1");
    }
}
