//! Hash computation for tree content using BLAKE3

use crate::error::StorageError;
use crate::types::Hash;
use blake3::Hasher;
use std::fs::File;
use std::io;
use std::path::Path;

/// Domain separator for tree digests, bumped whenever entry framing changes.
const TREE_DIGEST_DOMAIN: &[u8] = b"patchchain.tree-digest.v1";

/// Incremental hasher over an ordered sequence of tree entries
///
/// digest = hash(domain || for each entry: key_len || key || content_len || content || entry_count)
///
/// Lengths are 8-byte big-endian so no two distinct entry sequences share a byte stream.
pub struct TreeHasher {
    hasher: Hasher,
    entries: u64,
}

impl TreeHasher {
    pub fn new() -> Self {
        let mut hasher = Hasher::new();
        hasher.update(TREE_DIGEST_DOMAIN);
        Self { hasher, entries: 0 }
    }

    /// Fold one file into the digest, streaming its content from disk.
    ///
    /// `expected_len` is the length observed when the tree was walked; a file that
    /// grows or shrinks before it is read fails the whole computation.
    pub fn update_file(
        &mut self,
        key: &str,
        path: &Path,
        expected_len: u64,
    ) -> Result<(), StorageError> {
        let key_bytes = key.as_bytes();
        self.hasher.update(&(key_bytes.len() as u64).to_be_bytes());
        self.hasher.update(key_bytes);
        self.hasher.update(&expected_len.to_be_bytes());

        let mut file = File::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                e.kind(),
                format!("Failed to open {}: {}", path.display(), e),
            ))
        })?;
        let copied = io::copy(&mut file, &mut self.hasher).map_err(|e| {
            StorageError::IoError(io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        if copied != expected_len {
            return Err(StorageError::ChangedDuringScan(path.to_path_buf()));
        }

        self.entries += 1;
        Ok(())
    }

    pub fn finalize(mut self) -> Hash {
        self.hasher.update(&self.entries.to_be_bytes());
        *self.hasher.finalize().as_bytes()
    }
}

impl Default for TreeHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash one file's content by streaming it from disk
pub fn hash_file(path: &Path) -> Result<Hash, StorageError> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(*hasher.finalize().as_bytes())
}
