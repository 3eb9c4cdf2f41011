//! Canonical content digest of a materialized tree
//!
//! The digest covers every regular file below the root, ordered byte-wise by relative
//! key, so directory listing order, timestamps and permission bits never change it.

use crate::error::StorageError;
use crate::tree::hasher::TreeHasher;
use crate::tree::walker::{Entry, Walker};
use crate::types::Hash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, instrument};

/// Fixed-width fingerprint of a tree's content
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(Hash);

impl Digest {
    /// Compute the digest of the tree rooted at `root`
    ///
    /// Fails if the root is missing or any file cannot be read in full; nothing is
    /// cached between calls, so a failed computation leaves no partial state behind.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn compute(root: &Path) -> Result<Digest, StorageError> {
        let start = Instant::now();
        let entries = Walker::new(root.to_path_buf()).files()?;

        let mut hasher = TreeHasher::new();
        for entry in &entries {
            if let Entry::File { key, path, size } = entry {
                hasher.update_file(key, path, *size)?;
            }
        }
        let digest = Digest(hasher.finalize());

        debug!(
            files = entries.len(),
            digest = %digest,
            duration_ms = start.elapsed().as_millis(),
            "Computed tree digest"
        );
        Ok(digest)
    }

    pub fn from_bytes(bytes: Hash) -> Self {
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Compare against an untrusted expected value in constant time
    ///
    /// Any input that is not exactly the digest width is simply not valid.
    pub fn is_valid(&self, expected: &[u8]) -> bool {
        match <[u8; 32]>::try_from(expected) {
            Ok(bytes) => blake3::Hash::from(self.0) == blake3::Hash::from(bytes),
            Err(_) => false,
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| format!("digest is not valid hex: {}", e))?;
        let hash: Hash = bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("digest must be 32 bytes, got {}", bytes.len()))?;
        Ok(Digest(hash))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
