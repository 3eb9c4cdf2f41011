//! Shared fixtures for integration tests

use patchchain::patch::PatchMetadata;
use patchchain::sandbox::WorkArea;
use patchchain::tree::walker::{Entry, Walker};
use patchchain::tree::Digest;
use patchchain::types::{Signature, SIGNATURE_LEN};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn sig(byte: u8) -> Signature {
    Signature::from_bytes([byte; SIGNATURE_LEN])
}

/// Write `files` below `root`, creating parent directories as needed
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (key, content) in files {
        let path = root.join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Every regular file of a tree as key -> content
pub fn read_tree(root: &Path) -> BTreeMap<String, String> {
    Walker::new(root.to_path_buf())
        .files()
        .unwrap()
        .into_iter()
        .map(|entry| match entry {
            Entry::File { key, path, .. } => (key, fs::read_to_string(path).unwrap()),
            Entry::Symlink { key, .. } => panic!("unexpected symlink {}", key),
        })
        .collect()
}

pub fn tree_of(files: &[(&str, &str)]) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Work area rooted in a fresh temp directory
pub struct Node {
    pub dir: TempDir,
    pub area: WorkArea,
}

impl Node {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let area = WorkArea::new(&data, &data.join("_temp")).unwrap();
        Self { dir, area }
    }

    /// Materialize a base tree inside the work area
    pub fn base(&self, files: &[(&str, &str)]) -> PathBuf {
        let path = self.area.allocate_dir("base-").unwrap();
        write_tree(&path, files);
        path
    }

    /// Materialize a patch tree inside the work area with its sidecar record
    pub fn patch(
        &self,
        files: &[(&str, &str)],
        previous_signature: Signature,
        previous_hash: Digest,
        removed: &[&str],
    ) -> PathBuf {
        let path = self.area.allocate_dir("patch-").unwrap();
        write_tree(&path, files);
        PatchMetadata::new(
            previous_signature,
            previous_hash,
            removed.iter().map(|s| s.to_string()).collect(),
        )
        .write(&path)
        .unwrap();
        path
    }
}
