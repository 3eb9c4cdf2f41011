//! Integration tests for the patch-chain combiner

mod cleanup_containment;
mod combine_pipeline;
mod patch_roundtrip;
mod resource_chain;
mod test_utils;
