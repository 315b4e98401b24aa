//! Plaintext and ciphertext containers.
//!
//! An [`OpenBox`] holds plaintext and wipes it on drop. A [`LockedBox`] holds
//! ciphertext plus the version tag of the key that produced it, so the right
//! algorithm can be found again when it is unlocked.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Plaintext bytes. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenBox(Zeroizing<Vec<u8>>);

impl OpenBox {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(data.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for OpenBox {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl From<Vec<u8>> for OpenBox {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl std::fmt::Debug for OpenBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenBox([REDACTED; {}])", self.0.len())
    }
}

/// Ciphertext tagged with the algorithm version that produced it.
///
/// Serialized as `{"enc_data": "<base64>", "key_origin": "<tag>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBox {
    #[serde(with = "base64_bytes")]
    pub enc_data: Vec<u8>,
    pub key_origin: String,
}

impl LockedBox {
    pub fn new(enc_data: Vec<u8>, key_origin: impl Into<String>) -> Self {
        Self {
            enc_data,
            key_origin: key_origin.into(),
        }
    }
}

pub(crate) mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
