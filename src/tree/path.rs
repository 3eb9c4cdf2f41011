//! Path canonicalization and relative-key utilities
//!
//! Every file inside a materialized tree is addressed by a *relative key*: its path below
//! the tree root, UTF-8, with `/` separators and only normal components. Keys are what
//! the digest hashes, what delete markers name, and what the merger writes.

use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

/// Name of the sidecar directory that carries patch metadata inside a patch tree.
///
/// It is never part of a tree's content: walks, digests and merges skip it.
pub const SIDECAR_DIR: &str = ".patch";

/// Canonicalize a path for containment checks
///
/// Resolves symlinks, `..` and `.` against the filesystem, so the path must exist.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, StorageError> {
    // Use dunce for cross-platform canonicalization
    dunce::canonicalize(path).map_err(|e| {
        StorageError::InvalidPath(format!(
            "Failed to canonicalize path {}: {}",
            path.display(),
            e
        ))
    })
}

/// Compute the relative key of `path` below `root`.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, StorageError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        StorageError::InvalidPath(format!(
            "{} is not inside {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    StorageError::InvalidPath(format!(
                        "Non UTF-8 file name under {}: {}",
                        root.display(),
                        path.display()
                    ))
                })?;
                segments.push(name);
            }
            _ => {
                return Err(StorageError::InvalidPath(format!(
                    "Unexpected component in {}",
                    path.display()
                )))
            }
        }
    }

    if segments.is_empty() {
        return Err(StorageError::InvalidPath(format!(
            "{} has no relative key below its root",
            path.display()
        )));
    }

    Ok(segments.join("/"))
}

/// Validate an untrusted relative path (e.g. a delete marker) and return its key.
///
/// Rejects rather than clamps anything that could resolve outside the tree root:
/// absolute paths, `..`, `.`, empty segments, backslashes and NUL bytes.
pub fn sanitize_relative(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err("empty path".to_string());
    }
    if raw.contains('\\') || raw.contains('\0') {
        return Err(format!("illegal character in path {:?}", raw));
    }
    if raw.starts_with('/') {
        return Err(format!("absolute path {:?}", raw));
    }

    for segment in raw.split('/') {
        match segment {
            "" => return Err(format!("empty segment in path {:?}", raw)),
            "." | ".." => return Err(format!("path {:?} escapes the tree root", raw)),
            _ => {}
        }
    }

    // Catch platform prefixes such as `C:` that only `Path` recognises
    let escapes = Path::new(raw)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(format!("path {:?} escapes the tree root", raw));
    }

    Ok(raw.to_string())
}

/// Resolve a relative key to a filesystem path below `root`.
pub fn key_to_path(root: &Path, key: &str) -> PathBuf {
    key.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
}

/// Parent keys of `key`, shallowest first (`a/b/c` -> `a`, `a/b`).
pub fn ancestor_keys(key: &str) -> impl Iterator<Item = &str> {
    key.match_indices('/').map(move |(idx, _)| &key[..idx])
}
