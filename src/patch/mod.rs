//! Patch trees
//!
//! A patch tree holds the files a version adds or replaces relative to its predecessor,
//! plus a sidecar record with the predecessor's signature, its digest and the delete
//! markers.

pub mod diff;
pub mod merge;
pub mod metadata;

pub use diff::{create_patch, PatchSummary};
pub use merge::TreeMerger;
pub use metadata::PatchMetadata;
