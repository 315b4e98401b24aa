//! Folder engine configuration.

use crate::error::{FolderError, FolderResult};
use keyfold_crypto::{CryptoConfig, EncryptionRegistry};
use serde::{Deserialize, Serialize};

/// Default bound on parent chain walks.
pub const DEFAULT_MAX_HIERARCHY_DEPTH: usize = 64;

/// Repository name under which records are filed into folders.
pub const RECORDS_REPOSITORY: &str = "RECORDS_RECORD";

/// Configuration for the folder engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersConfig {
    /// Algorithm versions and password stretching.
    pub crypto: CryptoConfig,

    /// Maximum number of parent links followed while resolving a key.
    pub max_hierarchy_depth: usize,

    /// Items of this repository block folder deletion.
    pub records_repository: String,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            crypto: CryptoConfig::default(),
            max_hierarchy_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
            records_repository: RECORDS_REPOSITORY.to_string(),
        }
    }
}

impl FoldersConfig {
    pub fn from_json_str(json: &str) -> FolderResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FolderError::Config(e.to_string()))?;
        if config.max_hierarchy_depth == 0 {
            return Err(FolderError::Config(
                "max_hierarchy_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Builds the algorithm registry described by `crypto`.
    pub fn registry(&self) -> FolderResult<EncryptionRegistry> {
        Ok(EncryptionRegistry::from_config(&self.crypto)?)
    }
}
