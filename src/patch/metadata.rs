//! Patch sidecar record
//!
//! Every patch tree carries `.patch/metadata.json`, a versioned JSON record naming the
//! version it extends and the files it deletes:
//!
//! ```json
//! {
//!   "version": 1,
//!   "previous_signature": "<128 hex chars>",
//!   "previous_hash": "<64 hex chars>",
//!   "removed": ["dir/old.txt"],
//!   "created_at": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! The record is untrusted network input. The reader only checks its shape; whether its
//! claims hold is decided by the combiner.

use crate::error::MetadataError;
use crate::tree::path::SIDECAR_DIR;
use crate::tree::Digest;
use crate::types::Signature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the record inside the sidecar directory
pub const METADATA_FILE: &str = "metadata.json";

/// Current on-disk format version
pub const METADATA_VERSION: u32 = 1;

/// Declared ancestry and delete markers of one patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchMetadata {
    pub version: u32,

    #[serde(default)]
    pub previous_signature: Option<Signature>,

    #[serde(default)]
    pub previous_hash: Option<Digest>,

    /// Relative keys of base files the patch deletes
    #[serde(default)]
    pub removed: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PatchMetadata {
    pub fn new(previous_signature: Signature, previous_hash: Digest, removed: Vec<String>) -> Self {
        Self {
            version: METADATA_VERSION,
            previous_signature: Some(previous_signature),
            previous_hash: Some(previous_hash),
            removed,
            created_at: Some(Utc::now()),
        }
    }

    pub fn previous_signature(&self) -> Option<&Signature> {
        self.previous_signature.as_ref()
    }

    pub fn previous_hash(&self) -> Option<&Digest> {
        self.previous_hash.as_ref()
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    /// Path of the record for the patch tree at `patch_tree`
    pub fn path_for(patch_tree: &Path) -> PathBuf {
        patch_tree.join(SIDECAR_DIR).join(METADATA_FILE)
    }

    /// Load the record stored in `patch_tree`
    pub fn read(patch_tree: &Path) -> Result<PatchMetadata, MetadataError> {
        let path = Self::path_for(patch_tree);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MetadataError::Missing(path));
            }
            Err(e) => return Err(MetadataError::IoError(e)),
        };

        let metadata: PatchMetadata =
            serde_json::from_slice(&bytes).map_err(|e| MetadataError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if metadata.version != METADATA_VERSION {
            return Err(MetadataError::UnsupportedVersion(metadata.version));
        }

        debug!(
            path = %path.display(),
            removed = metadata.removed.len(),
            "Read patch metadata"
        );
        Ok(metadata)
    }

    /// Store the record in `patch_tree`, replacing any previous one
    ///
    /// Written to a temporary file and renamed into place so readers never observe a
    /// half-written record.
    pub fn write(&self, patch_tree: &Path) -> Result<(), MetadataError> {
        let path = Self::path_for(patch_tree);
        let sidecar = patch_tree.join(SIDECAR_DIR);
        fs::create_dir_all(&sidecar)?;

        let serialized =
            serde_json::to_vec_pretty(self).map_err(|e| MetadataError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &serialized)?;
        fs::rename(&temp_path, &path).map_err(|e| {
            // Clean up temp file on error
            let _ = fs::remove_file(&temp_path);
            MetadataError::IoError(e)
        })?;

        Ok(())
    }
}
