//! Materialized trees
//!
//! A materialized tree is a directory holding one resource version's files. This module
//! walks trees, addresses their files by relative key and fingerprints their content.

pub mod digest;
pub mod hasher;
pub mod path;
pub mod walker;

pub use digest::Digest;
