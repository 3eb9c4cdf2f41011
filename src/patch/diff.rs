//! Patch authoring: derive a patch tree from two full trees
//!
//! The output holds every file of `after` that is new or changed, and a sidecar record
//! whose delete markers list the files of `before` that `after` no longer has.

use crate::error::{CombineError, StorageError};
use crate::patch::metadata::PatchMetadata;
use crate::tree::hasher;
use crate::tree::path;
use crate::tree::walker::{Entry, Walker};
use crate::tree::Digest;
use crate::types::Signature;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Outcome of authoring one patch
#[derive(Debug, Clone)]
pub struct PatchSummary {
    pub previous_hash: Digest,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl PatchSummary {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

fn regular_files(root: &Path) -> Result<BTreeMap<String, PathBuf>, StorageError> {
    let mut files = BTreeMap::new();
    for entry in Walker::new(root.to_path_buf()).walk()? {
        match entry {
            Entry::File { key, path, .. } => {
                files.insert(key, path);
            }
            Entry::Symlink { key, .. } => {
                return Err(StorageError::InvalidPath(format!(
                    "cannot publish symlink {:?} in {}",
                    key,
                    root.display()
                )));
            }
        }
    }
    Ok(files)
}

/// Write a patch that turns `before` into `after` into the directory `out`
///
/// `previous_signature` is the signature of the transaction that published `before`.
/// `out` must not exist yet or be empty.
#[instrument(skip_all, fields(before = %before.display(), after = %after.display(), out = %out.display()))]
pub fn create_patch(
    before: &Path,
    after: &Path,
    out: &Path,
    previous_signature: Signature,
) -> Result<PatchSummary, CombineError> {
    if out.exists() && fs::read_dir(out)?.next().is_some() {
        return Err(CombineError::InvalidState(format!(
            "patch output directory {} is not empty",
            out.display()
        )));
    }

    let previous_hash = Digest::compute(before)?;
    let before_files = regular_files(before)?;
    let after_files = regular_files(after)?;

    fs::create_dir_all(out)?;

    let mut changed = Vec::new();
    for (key, source) in &after_files {
        let differs = match before_files.get(key) {
            Some(old) => hasher::hash_file(old)? != hasher::hash_file(source)?,
            None => true,
        };
        if differs {
            let dest = path::key_to_path(out, key);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &dest)?;
            changed.push(key.clone());
        }
    }

    let removed: Vec<String> = before_files
        .keys()
        .filter(|key| !after_files.contains_key(*key))
        .cloned()
        .collect();

    PatchMetadata::new(previous_signature, previous_hash, removed.clone()).write(out)?;

    info!(
        changed = changed.len(),
        removed = removed.len(),
        previous_hash = %previous_hash,
        "Created patch"
    );

    Ok(PatchSummary {
        previous_hash,
        changed,
        removed,
    })
}
