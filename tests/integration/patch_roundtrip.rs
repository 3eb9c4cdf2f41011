//! Integration tests for agreement between the patch writer and the merger

use super::test_utils::{read_tree, sig, write_tree, Node};
use patchchain::combine::{CombineRequest, ScopedCombine};
use patchchain::patch::{create_patch, PatchMetadata, TreeMerger};
use patchchain::tree::Digest;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_written_patch_combines_to_target() {
    let node = Node::new();
    let before = node.base(&[("a.txt", "x"), ("b.txt", "y"), ("old/gone.txt", "bye")]);
    let after = TempDir::new().unwrap();
    write_tree(after.path(), &[("a.txt", "x"), ("b.txt", "z"), ("new/c.txt", "new")]);

    let patch = node.area.temp_root().join("authored");
    let summary = create_patch(&before, after.path(), &patch, sig(7)).unwrap();
    assert_eq!(summary.changed, vec!["b.txt".to_string(), "new/c.txt".to_string()]);
    assert_eq!(summary.removed, vec!["old/gone.txt".to_string()]);

    let metadata = PatchMetadata::read(&patch).unwrap();
    assert_eq!(metadata.previous_signature(), Some(&sig(7)));
    assert_eq!(metadata.previous_hash(), Some(&Digest::compute(&before).unwrap()));
    assert!(!patch.join("a.txt").exists());

    let merged =
        ScopedCombine::from_request(CombineRequest::new(before, patch, sig(7)), &node.area)
            .run()
            .unwrap();
    assert_eq!(read_tree(&merged), read_tree(after.path()));
}

#[test]
fn test_identical_trees_give_empty_patch() {
    let dir = TempDir::new().unwrap();
    let files = [("a.txt", "x"), ("d/e.txt", "e")];
    write_tree(&dir.path().join("before"), &files);
    write_tree(&dir.path().join("after"), &files);

    let summary = create_patch(
        &dir.path().join("before"),
        &dir.path().join("after"),
        &dir.path().join("patch"),
        sig(1),
    )
    .unwrap();
    assert!(summary.is_empty());
}

#[test]
fn test_patch_output_must_be_empty() {
    let dir = TempDir::new().unwrap();
    write_tree(&dir.path().join("before"), &[("a.txt", "x")]);
    write_tree(&dir.path().join("after"), &[("a.txt", "y")]);
    write_tree(&dir.path().join("patch"), &[("stale.txt", "?")]);

    let result = create_patch(
        &dir.path().join("before"),
        &dir.path().join("after"),
        &dir.path().join("patch"),
        sig(1),
    );
    assert!(result.is_err());
}

fn files_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-e]{1,2}(/[a-e]{1,2})?", "[a-z]{0,8}", 0..8).prop_filter(
        "no file may also be a directory",
        |files| {
            files
                .keys()
                .all(|k| !files.keys().any(|o| o.starts_with(&format!("{}/", k))))
        },
    )
}

/// Test that merge(before, create_patch(before, after)) reproduces after
#[test]
fn test_diff_merge_agreement_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(24));

    runner
        .run(&(files_strategy(), files_strategy()), |(old, new)| {
            // A key that is a file on one side and a directory on the other cannot
            // be expressed by a single patch
            let clash = old.keys().any(|k| new.keys().any(|n| n.starts_with(&format!("{}/", k))))
                || new.keys().any(|k| old.keys().any(|o| o.starts_with(&format!("{}/", k))));
            prop_assume!(!clash);

            let dir = TempDir::new().unwrap();
            let before = dir.path().join("before");
            let after = dir.path().join("after");
            fs::create_dir_all(&before).unwrap();
            fs::create_dir_all(&after).unwrap();
            for (key, content) in &old {
                write_tree(&before, &[(key.as_str(), content.as_str())]);
            }
            for (key, content) in &new {
                write_tree(&after, &[(key.as_str(), content.as_str())]);
            }

            let patch = dir.path().join("patch");
            create_patch(&before, &after, &patch, sig(1)).unwrap();
            let merged = TreeMerger::new(dir.path().join("merge"))
                .merge(&before, &patch)
                .unwrap();

            prop_assert_eq!(
                Digest::compute(&merged).unwrap(),
                Digest::compute(&after).unwrap()
            );
            Ok(())
        })
        .unwrap();
}
