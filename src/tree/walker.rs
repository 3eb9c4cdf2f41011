//! Filesystem walker for enumerating the files of a materialized tree

use crate::error::StorageError;
use crate::tree::path::{self, SIDECAR_DIR};
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A regular file with its relative key, absolute path and size
    File {
        key: String,
        path: PathBuf,
        size: u64,
    },
    /// A symbolic link; never followed
    Symlink { key: String, path: PathBuf },
}

impl Entry {
    pub fn key(&self) -> &str {
        match self {
            Entry::File { key, .. } | Entry::Symlink { key, .. } => key,
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Top-level directory names that are not part of the tree's content
    pub excluded_roots: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            excluded_roots: vec![SIDECAR_DIR.to_string()],
            max_depth: None,
        }
    }
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the tree and collect its file and symlink entries
    ///
    /// Returns entries sorted byte-wise by relative key, independent of the order the
    /// filesystem lists directories in. Directories themselves are not reported.
    pub fn walk(&self) -> Result<Vec<Entry>, StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::RootNotFound(self.root.clone()));
        }

        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                StorageError::IoError(std::io::Error::other(format!(
                    "Failed to walk directory {}: {}",
                    self.root.display(),
                    e
                )))
            })?;

            // Skip the root directory itself (we only want its contents)
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let entry_path = entry.path().to_path_buf();
            let key = path::relative_key(&self.root, &entry_path)?;

            if file_type.is_symlink() {
                entries.push(Entry::Symlink {
                    key,
                    path: entry_path,
                });
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| {
                    StorageError::IoError(std::io::Error::other(format!(
                        "Failed to read metadata for {}: {}",
                        entry_path.display(),
                        e
                    )))
                })?;
                entries.push(Entry::File {
                    key,
                    path: entry_path,
                    size: metadata.len(),
                });
            }
            // Sockets, fifos and devices are not content
        }

        entries.sort_by(|a, b| a.key().as_bytes().cmp(b.key().as_bytes()));

        Ok(entries)
    }

    /// Walk and keep only regular files
    pub fn files(&self) -> Result<Vec<Entry>, StorageError> {
        Ok(self
            .walk()?
            .into_iter()
            .filter(|e| matches!(e, Entry::File { .. }))
            .collect())
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() != 1 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.config.excluded_roots.iter().any(|ex| ex.as_str() == name)
    }
}
