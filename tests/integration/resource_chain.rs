//! Integration tests for rebuilding a resource from its layer chain

use super::test_utils::{read_tree, sig, tree_of, write_tree, Node};
use patchchain::error::CombineError;
use patchchain::resource::{Layer, LayerChainBuilder, ResourceId, ResourceLocks};
use patchchain::tree::Digest;
use std::thread;

#[test]
fn test_snapshot_and_two_patches() {
    let node = Node::new();
    let locks = ResourceLocks::new();
    let resource = ResourceId::new("alice", "WEBSITE");

    let snapshot = node.base(&[("index.html", "v1"), ("style.css", "body{}")]);
    let v1_digest = Digest::compute(&snapshot).unwrap();
    let patch1 = node.patch(&[("index.html", "v2")], sig(1), v1_digest, &[]);

    let expected_v2 = node.dir.path().join("expected-v2");
    write_tree(&expected_v2, &[("index.html", "v2"), ("style.css", "body{}")]);
    let v2_digest = Digest::compute(&expected_v2).unwrap();
    let patch2 = node.patch(&[("about.html", "hi")], sig(2), v2_digest, &["style.css"]);

    let layers = [
        Layer::snapshot(sig(1), snapshot.clone()),
        Layer::patch(sig(2), patch1.clone()),
        Layer::patch(sig(3), patch2.clone()),
    ];
    let built = LayerChainBuilder::new(&node.area, &locks)
        .build(&resource, &layers)
        .unwrap();

    assert_eq!(
        read_tree(&built),
        tree_of(&[("about.html", "hi"), ("index.html", "v2")])
    );
    assert!(!snapshot.exists());
    assert!(!patch1.exists());
    assert!(!patch2.exists());
}

#[test]
fn test_broken_link_stops_chain() {
    let node = Node::new();
    let locks = ResourceLocks::new();
    let snapshot = node.base(&[("a.txt", "x")]);
    // Patch claims a predecessor signed by someone else
    let patch = node.patch(&[("b.txt", "y")], sig(9), Digest::compute(&snapshot).unwrap(), &[]);

    let err = LayerChainBuilder::new(&node.area, &locks)
        .build(
            &ResourceId::new("alice", "WEBSITE"),
            &[Layer::snapshot(sig(1), snapshot), Layer::patch(sig(2), patch)],
        )
        .unwrap_err();
    assert!(matches!(err, CombineError::SignatureMismatch { .. }));
}

#[test]
fn test_parallel_builds_of_different_resources() {
    let node = Node::new();
    let locks = ResourceLocks::new();

    let jobs: Vec<_> = ["alice", "bob", "carol"]
        .iter()
        .map(|name| {
            let base = node.base(&[("owner.txt", *name)]);
            let patch = node.patch(
                &[("extra.txt", "1")],
                sig(1),
                Digest::compute(&base).unwrap(),
                &[],
            );
            (ResourceId::new(*name, "WEBSITE"), base, patch)
        })
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|(resource, base, patch)| {
                let area = &node.area;
                let locks = &locks;
                scope.spawn(move || {
                    LayerChainBuilder::new(area, locks).build(
                        resource,
                        &[
                            Layer::snapshot(sig(1), base.clone()),
                            Layer::patch(sig(2), patch.clone()),
                        ],
                    )
                })
            })
            .collect();

        for (handle, (resource, _, _)) in handles.into_iter().zip(&jobs) {
            let built = handle.join().unwrap().unwrap();
            assert_eq!(
                read_tree(&built).get("owner.txt").map(String::as_str),
                Some(resource.name.as_str())
            );
        }
    });
}
