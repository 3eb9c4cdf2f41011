//! Tree merger: base tree + patch tree -> fresh merged tree
//!
//! Per file, a patch either supplies new content (add or replace), lists the key in its
//! delete markers, or says nothing, in which case the base file is carried through.
//! Inputs are only read; the result is always written to a new directory.

use crate::error::{CombineError, StorageError};
use crate::patch::metadata::PatchMetadata;
use crate::tree::path;
use crate::tree::walker::{Entry, Walker};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Where a merged file's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Base(PathBuf),
    Patch(PathBuf),
}

impl Source {
    fn path(&self) -> &Path {
        match self {
            Source::Base(p) | Source::Patch(p) => p,
        }
    }
}

/// Counts describing one merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MergeSummary {
    carried: usize,
    replaced: usize,
    added: usize,
    removed: usize,
}

/// Fully validated set of files making up the merged tree
#[derive(Debug)]
struct MergePlan {
    files: BTreeMap<String, Source>,
    summary: MergeSummary,
}

impl MergePlan {
    fn build(
        path_before: &Path,
        path_after: &Path,
        removed: &[String],
    ) -> Result<MergePlan, CombineError> {
        let mut files: BTreeMap<String, Source> = BTreeMap::new();
        for entry in Walker::new(path_before.to_path_buf()).walk()? {
            match entry {
                Entry::File { key, path, .. } => {
                    files.insert(key, Source::Base(path));
                }
                Entry::Symlink { key, .. } => {
                    // Not covered by the digest, so never carried forward
                    debug!(key = %key, "Dropping symlink from base tree");
                }
            }
        }

        let mut patch_files: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in Walker::new(path_after.to_path_buf()).walk()? {
            match entry {
                Entry::File { key, path, .. } => {
                    patch_files.insert(key, path);
                }
                Entry::Symlink { key, .. } => {
                    return Err(CombineError::MergeConflict(format!(
                        "patch tree contains symlink {:?}",
                        key
                    )));
                }
            }
        }

        let mut summary = MergeSummary::default();

        let mut deletions = BTreeSet::new();
        for raw in removed {
            let key = path::sanitize_relative(raw).map_err(|reason| {
                CombineError::MergeConflict(format!("rejected delete marker: {}", reason))
            })?;
            if patch_files.contains_key(&key) {
                return Err(CombineError::MergeConflict(format!(
                    "{:?} is both deleted and supplied by the patch",
                    key
                )));
            }
            deletions.insert(key);
        }

        for key in &deletions {
            if files.remove(key).is_none() {
                return Err(CombineError::MergeConflict(format!(
                    "delete marker {:?} names no file in the base tree",
                    key
                )));
            }
            summary.removed += 1;
        }

        for (key, source) in patch_files {
            match files.insert(key, Source::Patch(source)) {
                Some(_) => summary.replaced += 1,
                None => summary.added += 1,
            }
        }
        summary.carried = files
            .values()
            .filter(|s| matches!(s, Source::Base(_)))
            .count();

        // A key cannot be a file and the parent directory of another file at once
        for key in files.keys() {
            if let Some(parent) = path::ancestor_keys(key).find(|p| files.contains_key(*p)) {
                return Err(CombineError::MergeConflict(format!(
                    "{:?} is a file in the merged tree but also the parent of {:?}",
                    parent, key
                )));
            }
        }

        Ok(MergePlan { files, summary })
    }

    fn materialize(&self, output: &Path) -> Result<(), StorageError> {
        for (key, source) in &self.files {
            let dest = path::key_to_path(output, key);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source.path(), &dest).map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to copy {} to {}: {}",
                        source.path().display(),
                        dest.display(),
                        e
                    ),
                ))
            })?;
        }
        Ok(())
    }
}

/// Applies patch trees onto base trees
pub struct TreeMerger {
    merge_root: PathBuf,
}

impl TreeMerger {
    /// Create a merger that allocates result trees below `merge_root`
    pub fn new(merge_root: PathBuf) -> Self {
        Self { merge_root }
    }

    pub fn merge_root(&self) -> &Path {
        &self.merge_root
    }

    /// Merge, reading delete markers from the patch's own sidecar record
    pub fn merge(&self, path_before: &Path, path_after: &Path) -> Result<PathBuf, CombineError> {
        let metadata = PatchMetadata::read(path_after)?;
        self.merge_with(path_before, path_after, &metadata)
    }

    /// Merge using an already-read sidecar record
    ///
    /// Returns the path of a new directory below the merge root. On any failure the
    /// partially written directory is removed before the error is returned.
    #[instrument(skip_all, fields(before = %path_before.display(), after = %path_after.display()))]
    pub fn merge_with(
        &self,
        path_before: &Path,
        path_after: &Path,
        metadata: &PatchMetadata,
    ) -> Result<PathBuf, CombineError> {
        let start = Instant::now();
        let plan = MergePlan::build(path_before, path_after, metadata.removed())?;

        fs::create_dir_all(&self.merge_root)?;
        let output = tempfile::Builder::new()
            .prefix("merge-")
            .tempdir_in(&self.merge_root)?;

        if let Err(e) = plan.materialize(output.path()) {
            warn!(error = %e, "Merge aborted while writing result tree");
            return Err(e.into());
        }

        let final_path = output.keep();
        info!(
            path = %final_path.display(),
            carried = plan.summary.carried,
            replaced = plan.summary.replaced,
            added = plan.summary.added,
            removed = plan.summary.removed,
            duration_ms = start.elapsed().as_millis(),
            "Merged patch onto base tree"
        );
        Ok(final_path)
    }
}
