//! Integration tests for containment of working-directory cleanup

use super::test_utils::{sig, write_tree, Node};
use patchchain::combine::cleanup::release_path;
use patchchain::combine::{CombineRequest, ScopedCombine};
use patchchain::patch::TreeMerger;
use patchchain::sandbox::PathPolicy;
use patchchain::tree::Digest;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tempfile::TempDir;

#[test]
fn test_outside_path_left_untouched() {
    let node = Node::new();
    let outside = TempDir::new().unwrap();
    let victim = outside.path().join("victim");
    write_tree(&victim, &[("keep.txt", "precious")]);

    release_path(&node.area, &victim);

    assert!(victim.join("keep.txt").exists());
    assert!(outside.path().exists());
}

#[test]
fn test_inside_path_and_empty_parent_removed() {
    let node = Node::new();
    let parent = node.area.data_root().join("WEBSITE").join("alice");
    let target = parent.join("v1");
    write_tree(&target, &[("index.html", "<html/>")]);

    release_path(&node.area, &target);

    assert!(!target.exists());
    assert!(!parent.exists());
    assert!(node.area.data_root().exists());
}

#[test]
fn test_parent_with_siblings_kept() {
    let node = Node::new();
    let parent = node.area.data_root().join("WEBSITE");
    write_tree(&parent.join("alice"), &[("a", "1")]);
    write_tree(&parent.join("bob"), &[("b", "2")]);

    release_path(&node.area, &parent.join("alice"));

    assert!(!parent.join("alice").exists());
    assert!(parent.join("bob").join("b").exists());
}

#[test]
fn test_roots_never_removed() {
    let node = Node::new();
    release_path(&node.area, node.area.temp_root());
    release_path(&node.area, node.area.data_root());

    assert!(node.area.temp_root().is_dir());
    assert!(node.area.data_root().is_dir());
    assert!(!node.area.is_sanctioned(node.area.temp_root()));
}

#[test]
fn test_combine_of_outside_inputs_keeps_them() {
    let node = Node::new();
    let outside = TempDir::new().unwrap();
    let base = outside.path().join("base");
    let patch = outside.path().join("patch");
    write_tree(&base, &[("a.txt", "x")]);
    write_tree(&patch, &[("b.txt", "y")]);
    patchchain::patch::PatchMetadata::new(sig(1), Digest::compute(&base).unwrap(), vec![])
        .write(&patch)
        .unwrap();

    let merged = ScopedCombine::from_request(
        CombineRequest::new(base.clone(), patch.clone(), sig(1)),
        &node.area,
    )
    .run()
    .unwrap();

    assert!(base.join("a.txt").exists());
    assert!(patch.join("b.txt").exists());
    assert!(merged.join("b.txt").exists());
    assert_eq!(fs::read_to_string(merged.join("a.txt")).unwrap(), "x");
}

/// Releasing one merged tree must not pull the merge root out from under a
/// concurrent merge of another resource
#[test]
fn test_concurrent_release_keeps_merge_root() {
    let node = Node::new();
    let base = node.base(&[("a.txt", "x")]);
    let patch = node.patch(&[("b.txt", "y")], sig(1), Digest::compute(&base).unwrap(), &[]);
    let merger = TreeMerger::new(node.area.merge_root());
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            let other = node.area.merge_root().join("other");
            while !done.load(Ordering::SeqCst) {
                if fs::create_dir_all(&other).is_ok() {
                    release_path(&node.area, &other);
                }
            }
        });

        let mut failures = 0;
        for _ in 0..300 {
            match merger.merge(&base, &patch) {
                Ok(merged) => {
                    let _ = fs::remove_dir_all(merged);
                }
                Err(_) => failures += 1,
            }
        }
        done.store(true, Ordering::SeqCst);
        assert_eq!(failures, 0);
    });

    assert!(node.area.merge_root().is_dir());
}
