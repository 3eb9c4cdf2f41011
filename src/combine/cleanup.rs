//! Best-effort release of combine working directories

use crate::sandbox::PathPolicy;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Remove `path` and then its parent if it became empty
///
/// Nothing is touched unless `policy` sanctions it, and the check always runs before
/// the delete. Failures are logged and swallowed; stragglers are left for a later
/// maintenance sweep.
pub fn release_path(policy: &dyn PathPolicy, path: &Path) {
    // The parent must be resolved while the child still exists
    let parent = path.parent().map(Path::to_path_buf);
    let parent_sanctioned = parent
        .as_deref()
        .map(|p| policy.is_sanctioned(p))
        .unwrap_or(false);

    if policy.is_sanctioned(path) {
        match fs::remove_dir_all(path) {
            Ok(()) => debug!(path = %path.display(), "Removed working directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                info!(path = %path.display(), error = %e, "Unable to cleanup directory");
            }
        }
    } else {
        debug!(path = %path.display(), "Leaving unsanctioned path in place");
    }

    let parent = match parent {
        Some(p) if parent_sanctioned => p,
        _ => return,
    };
    match fs::remove_dir(&parent) {
        Ok(()) => debug!(path = %parent.display(), "Removed empty parent directory"),
        // Another resource may still share the parent
        Err(e) if is_not_empty(&e) || e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %parent.display(), error = %e, "Unable to cleanup parent directory");
        }
    }
}

fn is_not_empty(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::DirectoryNotEmpty
        || (ENOTEMPTY.is_some() && err.raw_os_error() == ENOTEMPTY)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const ENOTEMPTY: Option<i32> = Some(39);
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
const ENOTEMPTY: Option<i32> = Some(66);
// ERROR_DIR_NOT_EMPTY
#[cfg(windows)]
const ENOTEMPTY: Option<i32> = Some(145);
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    windows
)))]
const ENOTEMPTY: Option<i32> = None;
