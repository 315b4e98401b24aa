//! Encryption configuration.

use crate::algorithm::{CHACHA20_POLY1305_V1, X25519_SEALED_BOX_V1, XCHACHA20_POLY1305_V2};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;
use serde::{Deserialize, Serialize};

/// Which algorithm versions a process registers, and how passwords are stretched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Symmetric version tags in registration order. The last one encrypts new data.
    pub symmetric_versions: Vec<String>,

    /// Asymmetric version tags in registration order.
    pub asymmetric_versions: Vec<String>,

    /// Argon2id parameters for password-derived keys.
    pub kdf: KdfParams,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            symmetric_versions: vec![
                CHACHA20_POLY1305_V1.to_string(),
                XCHACHA20_POLY1305_V2.to_string(),
            ],
            asymmetric_versions: vec![X25519_SEALED_BOX_V1.to_string()],
            kdf: KdfParams::default(),
        }
    }
}

impl CryptoConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::Config(e.to_string()))
    }
}
