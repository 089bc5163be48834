//! Tests for the copy-on-write mutation engine

use super::*;
use crate::{
    error::TreeError,
    properties::{Children, NodeId, NodePatch, RawNode, TreeNode},
    tests::helpers::{child_ids, leaf, node, same, sample_tree},
};
use std::{collections::BTreeSet, sync::Arc};
use test_log::test;

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn new_node(s: &str) -> NodeRef {
    Arc::new(TreeNode::from_raw(leaf(s)))
}

#[test]
fn test_add_at_top_level_appends() {
    let tree = sample_tree();
    let next = add_node_at_path(&tree, &[], new_node("d"));
    let roots: Vec<String> = next.roots().iter().map(|n| n.id.to_string()).collect();
    assert_eq!(roots, vec!["a", "b", "c", "d"]);
    for (before, after) in tree.roots().iter().zip(next.roots()) {
        assert!(same(before, after));
    }
}

#[test]
fn test_add_under_nested_parent_copies_only_the_path() {
    let tree = sample_tree();
    let next = add_node_at_path(&tree, &[id("a"), id("a2")], new_node("a2y"));

    assert_eq!(child_ids(&node(&next, "a2")), vec!["a2x", "a2y"]);
    // Ancestors on the path are new values.
    assert!(!same(&node(&tree, "a"), &node(&next, "a")));
    assert!(!same(&node(&tree, "a2"), &node(&next, "a2")));
    // Everything off the path is shared.
    assert!(same(&node(&tree, "a1"), &node(&next, "a1")));
    assert!(same(&node(&tree, "a2x"), &node(&next, "a2x")));
    assert!(same(&node(&tree, "b"), &node(&next, "b")));
    assert!(same(&node(&tree, "c"), &node(&next, "c")));
}

#[test]
fn test_add_under_unloaded_parent_is_a_no_op() {
    let tree = sample_tree();
    let next = add_node_at_path(&tree, &[id("c")], new_node("c1"));
    assert!(next.ptr_eq(&tree));
}

#[test]
fn test_add_under_unknown_path_is_a_no_op() {
    let tree = sample_tree();
    let next = add_node_at_path(&tree, &[id("a"), id("zzz")], new_node("x"));
    assert!(next.ptr_eq(&tree));
}

#[test]
fn test_remove_returns_detached_subtree() {
    let tree = sample_tree();
    let (next, removed) = find_and_remove_node(&tree, &id("a2"));
    let removed = removed.unwrap();
    assert!(same(&removed, &node(&tree, "a2")));
    assert_eq!(child_ids(&removed), vec!["a2x"]);
    assert_eq!(child_ids(&node(&next, "a")), vec!["a1"]);
    assert!(find_node_and_path(&next, &id("a2x")).is_none());
    assert!(same(&node(&tree, "a1"), &node(&next, "a1")));
    assert!(same(&node(&tree, "b"), &node(&next, "b")));
}

#[test]
fn test_remove_last_child_leaves_loaded_empty() {
    let tree = sample_tree();
    let (next, _) = find_and_remove_node(&tree, &id("a2x"));
    let a2 = node(&next, "a2");
    assert_eq!(a2.children, Children::Loaded(vec![]));
    assert!(!a2.effective_has_children());
}

#[test]
fn test_remove_top_level_and_missing() {
    let tree = sample_tree();
    let (next, removed) = find_and_remove_node(&tree, &id("b"));
    assert!(removed.is_some());
    assert_eq!(next.roots().len(), 2);
    assert!(same(&tree.roots()[0], &next.roots()[0]));

    let (unchanged, removed) = find_and_remove_node(&tree, &id("missing"));
    assert!(removed.is_none());
    assert!(unchanged.ptr_eq(&tree));
}

#[test]
fn test_update_data_keeps_id_and_children() {
    let tree = sample_tree();
    let patch = NodePatch {
        id: Some(id("hijack")),
        icon: Some("star".into()),
        ..NodePatch::name("Renamed")
    };
    let (next, found) = update_node_data(&tree, &id("a2"), patch);
    assert!(found);
    let a2 = node(&next, "a2");
    assert_eq!(a2.id, id("a2"));
    assert_eq!(a2.name, "Renamed");
    assert_eq!(a2.icon.as_deref(), Some("star"));
    assert!(same(&node(&tree, "a2x"), &node(&next, "a2x")));
    assert!(same(&node(&tree, "a1"), &node(&next, "a1")));

    let (unchanged, found) = update_node_data(&tree, &id("missing"), NodePatch::name("x"));
    assert!(!found);
    assert!(unchanged.ptr_eq(&tree));
}

#[test]
fn test_update_in_children_loads_unloaded_node() {
    let tree = sample_tree();
    let next = update_node_in_children(
        &tree,
        &id("c"),
        vec![RawNode::folder("c1", "C1"), leaf("c2")],
    );
    let c = node(&next, "c");
    assert!(c.is_loaded());
    assert_eq!(child_ids(&c), vec!["c1", "c2"]);
    assert!(!node(&next, "c1").is_loaded());
    assert!(same(&node(&tree, "a"), &node(&next, "a")));
}

#[test]
fn test_update_in_children_with_empty_result_is_loaded_empty() {
    let tree = sample_tree();
    let next = update_node_in_children(&tree, &id("c"), vec![]);
    let c = node(&next, "c");
    assert_eq!(c.children, Children::Loaded(vec![]));
    assert!(!c.effective_has_children());
}

#[test]
fn test_update_in_children_strips_prepopulated_grandchildren() {
    let tree = sample_tree();
    let mut odd = RawNode::folder("c1", "C1");
    odd.children = Some(vec![leaf("c1a")]);
    let next = update_node_in_children(&tree, &id("c"), vec![odd]);
    assert!(!node(&next, "c1").is_loaded());
}

#[test]
fn test_update_in_children_for_missing_node_is_a_no_op() {
    let tree = sample_tree();
    let next = update_node_in_children(&tree, &id("gone"), vec![leaf("x")]);
    assert!(next.ptr_eq(&tree));
}

#[test]
fn test_move_rejects_self_and_descendants() {
    let tree = sample_tree();
    assert_eq!(
        move_node(&tree, &id("a"), Some(&id("a"))).unwrap_err(),
        TreeError::SelfMove(id("a"))
    );
    assert_eq!(
        move_node(&tree, &id("a"), Some(&id("a2"))).unwrap_err(),
        TreeError::CyclicMove {
            node: id("a"),
            target: id("a2")
        }
    );
    assert!(matches!(
        move_node(&tree, &id("a"), Some(&id("a2x"))),
        Err(TreeError::CyclicMove { .. })
    ));
}

#[test]
fn test_move_rejects_unloaded_target_and_unknown_ids() {
    let tree = sample_tree();
    assert_eq!(
        move_node(&tree, &id("b"), Some(&id("c"))).unwrap_err(),
        TreeError::TargetNotLoaded(id("c"))
    );
    assert!(matches!(
        move_node(&tree, &id("zzz"), None),
        Err(TreeError::NotFound(_))
    ));
    assert!(matches!(
        move_node(&tree, &id("b"), Some(&id("zzz"))),
        Err(TreeError::NotFound(_))
    ));
}

#[test]
fn test_move_into_loaded_folder() {
    let tree = sample_tree();
    let next = move_node(&tree, &id("b"), Some(&id("a2"))).unwrap();
    assert_eq!(child_ids(&node(&next, "a2")), vec!["a2x", "b"]);
    let roots: Vec<String> = next.roots().iter().map(|n| n.id.to_string()).collect();
    assert_eq!(roots, vec!["a", "c"]);
    assert!(same(&node(&tree, "b"), &node(&next, "b")));
    assert!(same(&node(&tree, "a1"), &node(&next, "a1")));
    assert!(same(&node(&tree, "c"), &node(&next, "c")));
}

#[test]
fn test_move_to_top_level() {
    let tree = sample_tree();
    let next = move_node(&tree, &id("a2"), None).unwrap();
    let roots: Vec<String> = next.roots().iter().map(|n| n.id.to_string()).collect();
    assert_eq!(roots, vec!["a", "b", "c", "a2"]);
    assert_eq!(child_ids(&node(&next, "a")), vec!["a1"]);
    // The moved subtree travels intact.
    assert!(same(&node(&tree, "a2"), &node(&next, "a2")));
}

#[test]
fn test_move_into_loaded_empty_folder() {
    let tree = update_node_in_children(&sample_tree(), &id("c"), vec![]);
    let next = move_node(&tree, &id("a1"), Some(&id("c"))).unwrap();
    assert_eq!(child_ids(&node(&next, "c")), vec!["a1"]);
    assert!(node(&next, "c").effective_has_children());
}

#[test]
fn test_ids_stay_unique_after_mutations() {
    let tree = sample_tree();
    let tree = move_node(&tree, &id("a2x"), None).unwrap();
    let tree = add_node_at_path(&tree, &[id("a")], new_node("a3"));
    let index = NodeIndex::build(&tree);
    let rows = flatten(
        &tree,
        &index.loaded_descendants(&id("a")).into_iter().chain([id("a")]).collect(),
        &BTreeSet::new(),
    );
    let unique: BTreeSet<&NodeId> = rows.iter().map(|r| &r.id).collect();
    assert_eq!(unique.len(), rows.len());
    assert_eq!(index.len(), 7);
}
