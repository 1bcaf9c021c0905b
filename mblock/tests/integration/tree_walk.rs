//! Naming and traversal of block hierarchies.

use std::collections::HashSet;

use mblock::block::Block;
use mblock::port::PortRole;

use crate::{init_tracing, protocols};

/// Builds a tree where block `n` has children `n.0`, `n.1`, ... down to the
/// requested depth, with `width` children per block.
fn build(name: &str, depth: usize, width: usize) -> Block {
    let mut block = Block::new(name, protocols());
    if depth > 0 {
        for i in 0..width {
            let child_name = format!("c{}", i);
            block
                .define_component(child_name.clone(), build(&child_name, depth - 1, width))
                .unwrap();
        }
    }

    block
}

/// Checks recursively that every child's full name derives from its parent's.
fn assert_fullnames(block: &Block) {
    for child in block.components() {
        assert_eq!(
            child.fullname(),
            format!("{}/{}", block.fullname(), child.name())
        );
        assert_eq!(child.parent(), Some(block.id()));
        assert_fullnames(child);
    }
}

#[test]
fn tree_walk_fullnames_follow_hierarchy() {
    init_tracing();

    let mut top = build("/top", 3, 2);
    assert_fullnames(&top);

    top.set_fullname("/moved");
    assert_fullnames(&top);
    assert_eq!(
        top.component("c1")
            .and_then(|b| b.component("c0"))
            .and_then(|b| b.component("c1"))
            .map(Block::fullname),
        Some("/moved/c1/c0/c1")
    );

    // Attaching a subtree renames all of its descendants.
    let mut root = Block::new("/root", protocols());
    root.define_component("sub", top).unwrap();
    assert_fullnames(&root);
    assert_eq!(
        root.component("sub")
            .and_then(|b| b.component("c0"))
            .map(Block::fullname),
        Some("/root/sub/c0")
    );
}

#[test]
fn tree_walk_visits_each_block_once() {
    init_tracing();

    let top = build("top", 3, 3);

    let mut paths = Vec::new();
    let mut ids = HashSet::new();
    let completed = top.walk_tree("top", |block, path| {
        assert!(ids.insert(block.id()));
        assert!(path.ends_with(block.name()));
        paths.push(path.to_owned());
        true
    });

    assert!(completed);
    assert_eq!(paths.len(), 1 + 3 + 9 + 27);

    // Pre-order: every path is preceded by its parent's path.
    for (i, path) in paths.iter().enumerate().skip(1) {
        let parent = &path[..path.rfind('/').unwrap()];
        assert!(paths[..i].iter().any(|p| p == parent));
    }
    assert_eq!(&paths[..4], ["top", "top/c0", "top/c0/c0", "top/c0/c0/c0"]);
}

#[test]
fn tree_walk_early_stop() {
    init_tracing();

    let top = build("", 2, 3);

    let mut paths = Vec::new();
    let completed = top.walk_tree("", |_, path| {
        paths.push(path.to_owned());
        path != "/c1"
    });

    assert!(!completed);
    assert_eq!(
        paths,
        ["", "/c0", "/c0/c0", "/c0/c1", "/c0/c2", "/c1"]
    );
}

#[test]
fn tree_walk_mut_defines_ports_everywhere() {
    init_tracing();

    let mut top = build("top", 2, 2);

    assert!(top.walk_tree_mut("top", |block, _| {
        block
            .define_port("ctl", "ctl", false, PortRole::External)
            .is_ok()
    }));

    let mut count = 0;
    top.walk_tree("top", |block, _| {
        assert!(block.has_port("ctl"));
        count += 1;
        true
    });
    assert_eq!(count, 7);

    // A second pass is rejected on the first block it visits.
    let mut visits = 0;
    assert!(!top.walk_tree_mut("top", |block, _| {
        visits += 1;
        block
            .define_port("ctl", "ctl", false, PortRole::External)
            .is_ok()
    }));
    assert_eq!(visits, 1);
}
