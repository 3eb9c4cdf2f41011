//! Patchchain: verified reconstruction of versioned file trees
//!
//! A resource version is published either as a full snapshot or as a patch against its
//! predecessor. This crate fingerprints trees, reads and writes patch sidecar records,
//! merges a patch onto its base, and drives the validate-then-merge pipeline that turns
//! a chain of layers into the latest tree.

pub mod cli;
pub mod combine;
pub mod config;
pub mod error;
pub mod logging;
pub mod patch;
pub mod resource;
pub mod sandbox;
pub mod tree;
pub mod types;
