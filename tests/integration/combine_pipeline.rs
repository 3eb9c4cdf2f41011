//! Integration tests for the validate-then-merge pipeline

use super::test_utils::{read_tree, sig, tree_of, Node};
use patchchain::combine::{CombineRequest, CombineStage, Combiner, ScopedCombine};
use patchchain::error::CombineError;
use patchchain::tree::Digest;
use std::fs;

#[test]
fn test_add_replace_and_carry() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x"), ("b.txt", "y")]);
    let patch = node.patch(
        &[("b.txt", "z"), ("c.txt", "new")],
        sig(1),
        Digest::compute(&base).unwrap(),
        &[],
    );

    let mut combiner = Combiner::new(CombineRequest::new(base, patch, sig(1)), &node.area);
    let merged = combiner.combine().unwrap().to_path_buf();

    assert_eq!(
        read_tree(&merged),
        tree_of(&[("a.txt", "x"), ("b.txt", "z"), ("c.txt", "new")])
    );
    assert!(merged.starts_with(node.area.merge_root()));
}

#[test]
fn test_delete_marker_removes_file() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x"), ("b.txt", "y"), ("docs/c.md", "c")]);
    let patch = node.patch(&[], sig(1), Digest::compute(&base).unwrap(), &["a.txt"]);

    let merged = ScopedCombine::from_request(CombineRequest::new(base, patch, sig(1)), &node.area)
        .run()
        .unwrap();

    assert_eq!(
        read_tree(&merged),
        tree_of(&[("b.txt", "y"), ("docs/c.md", "c")])
    );
}

#[test]
fn test_signature_mismatch_rejected() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x")]);
    let patch = node.patch(&[("a.txt", "y")], sig(1), Digest::compute(&base).unwrap(), &[]);

    let mut combiner = Combiner::new(CombineRequest::new(base, patch, sig(2)), &node.area);
    let err = combiner.combine().unwrap_err();

    assert!(matches!(err, CombineError::SignatureMismatch { .. }));
    assert!(err.is_integrity_failure());
    assert_eq!(combiner.stage(), CombineStage::Failed);
    assert!(combiner.final_path().is_none());
}

#[test]
fn test_corrupted_base_byte_is_hash_mismatch() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "hello"), ("b.txt", "y")]);
    let patch = node.patch(&[("c.txt", "new")], sig(1), Digest::compute(&base).unwrap(), &[]);

    // Flip one byte after the patch was authored
    let mut bytes = fs::read(base.join("a.txt")).unwrap();
    bytes[0] ^= 0x01;
    fs::write(base.join("a.txt"), bytes).unwrap();

    let mut combiner = Combiner::new(CombineRequest::new(base, patch, sig(1)), &node.area);
    let err = combiner.combine().unwrap_err();

    assert!(matches!(err, CombineError::HashMismatch { .. }));
    assert_eq!(fs::read_dir(node.area.merge_root()).map(|d| d.count()).unwrap_or(0), 0);
}

#[test]
fn test_combine_is_deterministic() {
    let node = Node::new();
    let files = [("a.txt", "x"), ("dir/b.txt", "y")];
    let mut outputs = Vec::new();

    for _ in 0..2 {
        let base = node.base(&files);
        let patch = node.patch(
            &[("dir/b.txt", "z"), ("c.txt", "new")],
            sig(3),
            Digest::compute(&base).unwrap(),
            &["a.txt"],
        );
        let merged =
            ScopedCombine::from_request(CombineRequest::new(base, patch, sig(3)), &node.area)
                .run()
                .unwrap();
        outputs.push(merged);
    }

    assert_ne!(outputs[0], outputs[1]);
    assert_eq!(
        Digest::compute(&outputs[0]).unwrap(),
        Digest::compute(&outputs[1]).unwrap()
    );
}

#[test]
fn test_path_traversal_marker_is_conflict() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x")]);
    let patch = node.patch(&[], sig(1), Digest::compute(&base).unwrap(), &["../outside.txt"]);

    let mut combiner = Combiner::new(CombineRequest::new(base, patch, sig(1)), &node.area);
    assert!(matches!(
        combiner.combine(),
        Err(CombineError::MergeConflict(_))
    ));
}

#[test]
fn test_missing_sidecar_is_metadata_error() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x")]);
    let patch = node.base(&[("b.txt", "y")]);

    let mut combiner = Combiner::new(CombineRequest::new(base, patch, sig(1)), &node.area);
    assert!(matches!(combiner.combine(), Err(CombineError::Metadata(_))));
}

#[test]
fn test_missing_input_is_invalid_state() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x")]);
    let missing = node.dir.path().join("never-fetched");

    let mut combiner = Combiner::new(CombineRequest::new(base, missing, sig(1)), &node.area);
    assert!(matches!(combiner.combine(), Err(CombineError::InvalidState(_))));
}
