//! Sanctioned working area
//!
//! The node may only delete from its own data and temp hierarchies. `WorkArea` owns those
//! roots and answers the containment question cleanup asks before touching anything.

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::tree::path;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the directory under the temp root where merged trees are allocated
pub const MERGE_DIR: &str = "merge";

/// Decides whether a path may be deleted by the node
pub trait PathPolicy: Send + Sync {
    fn is_sanctioned(&self, path: &Path) -> bool;
}

/// The node's data and temp hierarchies
#[derive(Debug, Clone)]
pub struct WorkArea {
    data_root: PathBuf,
    temp_root: PathBuf,
}

impl WorkArea {
    /// Create both roots if needed and pin them to their canonical form
    pub fn new(data_path: &Path, temp_path: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_path)?;
        fs::create_dir_all(temp_path)?;
        let work_area = Self {
            data_root: path::canonicalize_path(data_path)?,
            temp_root: path::canonicalize_path(temp_path)?,
        };
        debug!(
            data_root = %work_area.data_root.display(),
            temp_root = %work_area.temp_root.display(),
            "Work area ready"
        );
        Ok(work_area)
    }

    pub fn from_config(storage: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(&storage.data_path, &storage.temp_data_path)
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Directory where merged trees are allocated
    pub fn merge_root(&self) -> PathBuf {
        self.temp_root.join(MERGE_DIR)
    }

    /// Allocate a fresh, uniquely named working directory under the temp root
    ///
    /// Used by callers materializing fetched layers. The directory is not removed
    /// automatically; it is released by a combine's cleanup.
    pub fn allocate_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&self.temp_root)?;
        Ok(dir.keep())
    }

    /// True iff `candidate` itself lies strictly below one of the roots
    ///
    /// The entry is judged where it sits, not where it points: its parent is resolved
    /// (symlinks and `..` included) and its own name appended. Symlinks are never
    /// sanctioned, and neither are missing paths, the roots, or the shared merge root.
    pub fn contains(&self, candidate: &Path) -> bool {
        match fs::symlink_metadata(candidate) {
            Ok(meta) if !meta.file_type().is_symlink() => {}
            _ => return false,
        }
        let name = match candidate.file_name() {
            Some(name) => name,
            None => return false,
        };
        let parent = match candidate.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let resolved = match path::canonicalize_path(parent) {
            Ok(p) => p.join(name),
            Err(_) => return false,
        };

        let merge_root = self.merge_root();
        // The temp root usually nests inside the data root
        let protected = [&self.data_root, &self.temp_root, &merge_root];
        !protected.iter().any(|root| resolved == **root)
            && [&self.data_root, &self.temp_root]
                .iter()
                .any(|root| resolved.starts_with(root))
    }
}

impl PathPolicy for WorkArea {
    fn is_sanctioned(&self, path: &Path) -> bool {
        self.contains(path)
    }
}
