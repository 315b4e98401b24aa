use keyfold_crypto::CryptoError;

#[test]
fn duplicate_version_display() {
    let err = CryptoError::DuplicateVersion("S1".into());
    assert_eq!(err.to_string(), "encryption version 'S1' is already registered");
}

#[test]
fn unknown_version_display() {
    let err = CryptoError::UnknownAlgorithmVersion("Z9".into());
    assert_eq!(err.to_string(), "unknown encryption version 'Z9'");
}

#[test]
fn algorithm_mismatch_display() {
    let err = CryptoError::AlgorithmMismatch {
        key: "S2".into(),
        found: "S1".into(),
    };
    assert_eq!(
        err.to_string(),
        "algorithm mismatch: key is 'S2' but the box was locked with 'S1'"
    );
}

#[test]
fn not_directly_usable_display() {
    let err = CryptoError::NotDirectlyUsable("unlock");
    assert_eq!(
        err.to_string(),
        "this key is encrypted and can not be used directly to unlock"
    );
}

#[test]
fn invalid_key_length_display() {
    let err = CryptoError::InvalidKeyLength {
        expected: 32,
        actual: 7,
    };
    assert_eq!(err.to_string(), "invalid key length: expected 32, got 7");
}

#[test]
fn config_error_display() {
    let err = CryptoError::Config("empty".into());
    assert_eq!(err.to_string(), "invalid configuration: empty");
}
