//! Registry of encryption algorithm versions.
//!
//! New key material is always produced with the most recently registered
//! algorithm of its family, while anything already written stays decryptable as
//! long as the algorithm named by its version tag is still registered.
//!
//! The registry is a plain value: build one at process start and pass it by
//! reference to every operation that locks or unlocks data.

use crate::algorithm::{
    AsymmetricEncryption, ChaCha20Poly1305V1, SymmetricEncryption, X25519SealedBoxV1,
    XChaCha20Poly1305V2, CHACHA20_POLY1305_V1, X25519_SEALED_BOX_V1, XCHACHA20_POLY1305_V2,
};
use crate::config::CryptoConfig;
use crate::error::{CryptoError, CryptoResult};
use std::fmt;
use std::sync::Arc;

/// An algorithm resolved by version tag.
#[derive(Clone)]
pub enum Algorithm {
    Symmetric(Arc<dyn SymmetricEncryption>),
    Asymmetric(Arc<dyn AsymmetricEncryption>),
}

impl Algorithm {
    pub fn version(&self) -> &str {
        match self {
            Algorithm::Symmetric(a) => a.version(),
            Algorithm::Asymmetric(a) => a.version(),
        }
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Symmetric(a) => write!(f, "Symmetric({})", a.version()),
            Algorithm::Asymmetric(a) => write!(f, "Asymmetric({})", a.version()),
        }
    }
}

/// Versioned catalog of symmetric and asymmetric algorithms.
///
/// Registration order defines "highest": the last algorithm registered in a
/// family is the one used for new encryptions.
#[derive(Clone, Default)]
pub struct EncryptionRegistry {
    symmetric: Vec<Arc<dyn SymmetricEncryption>>,
    asymmetric: Vec<Arc<dyn AsymmetricEncryption>>,
}

impl EncryptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in algorithm: `S1`, `S2` and `A1`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.symmetric.push(Arc::new(ChaCha20Poly1305V1));
        registry.symmetric.push(Arc::new(XChaCha20Poly1305V2));
        registry.asymmetric.push(Arc::new(X25519SealedBoxV1));
        registry
    }

    /// Builds a registry from configured version tags, in the configured order.
    pub fn from_config(config: &CryptoConfig) -> CryptoResult<Self> {
        if config.symmetric_versions.is_empty() || config.asymmetric_versions.is_empty() {
            return Err(CryptoError::Config(
                "at least one symmetric and one asymmetric version is required".to_string(),
            ));
        }

        let mut registry = Self::new();
        for tag in &config.symmetric_versions {
            let algorithm: Arc<dyn SymmetricEncryption> = match tag.as_str() {
                CHACHA20_POLY1305_V1 => Arc::new(ChaCha20Poly1305V1),
                XCHACHA20_POLY1305_V2 => Arc::new(XChaCha20Poly1305V2),
                other => return Err(CryptoError::UnknownAlgorithmVersion(other.to_string())),
            };
            registry.add_symmetric_encryption(algorithm)?;
        }
        for tag in &config.asymmetric_versions {
            let algorithm: Arc<dyn AsymmetricEncryption> = match tag.as_str() {
                X25519_SEALED_BOX_V1 => Arc::new(X25519SealedBoxV1),
                other => return Err(CryptoError::UnknownAlgorithmVersion(other.to_string())),
            };
            registry.add_asymmetric_encryption(algorithm)?;
        }
        Ok(registry)
    }

    fn contains(&self, version: &str) -> bool {
        self.symmetric.iter().any(|a| a.version() == version)
            || self.asymmetric.iter().any(|a| a.version() == version)
    }

    /// Registers a symmetric algorithm under its own version tag.
    pub fn add_symmetric_encryption(
        &mut self,
        algorithm: Arc<dyn SymmetricEncryption>,
    ) -> CryptoResult<()> {
        if self.contains(algorithm.version()) {
            return Err(CryptoError::DuplicateVersion(algorithm.version().to_string()));
        }
        self.symmetric.push(algorithm);
        Ok(())
    }

    /// Registers an asymmetric algorithm under its own version tag.
    pub fn add_asymmetric_encryption(
        &mut self,
        algorithm: Arc<dyn AsymmetricEncryption>,
    ) -> CryptoResult<()> {
        if self.contains(algorithm.version()) {
            return Err(CryptoError::DuplicateVersion(algorithm.version().to_string()));
        }
        self.asymmetric.push(algorithm);
        Ok(())
    }

    /// The symmetric algorithm used for new keys.
    pub fn get_highest_symmetric(&self) -> CryptoResult<Arc<dyn SymmetricEncryption>> {
        self.symmetric
            .last()
            .cloned()
            .ok_or_else(|| CryptoError::Config("no symmetric encryption registered".to_string()))
    }

    /// The asymmetric algorithm used for new key pairs.
    pub fn get_highest_asymmetric(&self) -> CryptoResult<Arc<dyn AsymmetricEncryption>> {
        self.asymmetric
            .last()
            .cloned()
            .ok_or_else(|| CryptoError::Config("no asymmetric encryption registered".to_string()))
    }

    /// Resolves any registered algorithm by its version tag.
    pub fn get_by_version(&self, version: &str) -> CryptoResult<Algorithm> {
        if let Some(a) = self.symmetric.iter().find(|a| a.version() == version) {
            return Ok(Algorithm::Symmetric(Arc::clone(a)));
        }
        if let Some(a) = self.asymmetric.iter().find(|a| a.version() == version) {
            return Ok(Algorithm::Asymmetric(Arc::clone(a)));
        }
        Err(CryptoError::UnknownAlgorithmVersion(version.to_string()))
    }

    /// Resolves a symmetric algorithm; an asymmetric tag is a mismatch.
    pub fn get_symmetric(&self, version: &str) -> CryptoResult<Arc<dyn SymmetricEncryption>> {
        match self.get_by_version(version)? {
            Algorithm::Symmetric(a) => Ok(a),
            Algorithm::Asymmetric(a) => Err(CryptoError::AlgorithmMismatch {
                key: "symmetric".to_string(),
                found: a.version().to_string(),
            }),
        }
    }

    /// Resolves an asymmetric algorithm; a symmetric tag is a mismatch.
    pub fn get_asymmetric(&self, version: &str) -> CryptoResult<Arc<dyn AsymmetricEncryption>> {
        match self.get_by_version(version)? {
            Algorithm::Asymmetric(a) => Ok(a),
            Algorithm::Symmetric(a) => Err(CryptoError::AlgorithmMismatch {
                key: "asymmetric".to_string(),
                found: a.version().to_string(),
            }),
        }
    }

    pub fn symmetric_versions(&self) -> Vec<String> {
        self.symmetric.iter().map(|a| a.version().to_string()).collect()
    }

    pub fn asymmetric_versions(&self) -> Vec<String> {
        self.asymmetric.iter().map(|a| a.version().to_string()).collect()
    }
}

impl fmt::Debug for EncryptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionRegistry")
            .field("symmetric", &self.symmetric_versions())
            .field("asymmetric", &self.asymmetric_versions())
            .finish()
    }
}
