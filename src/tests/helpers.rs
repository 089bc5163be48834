//! Shared test utilities for tree-state testing

use std::sync::Arc;

use crate::{
    properties::{FlatNode, NodeId, NodeRef, RawNode},
    tree::Tree,
};

/// Initialize logging for tests
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A folder descriptor whose children are already attached.
pub fn loaded(id: &str, children: Vec<RawNode>) -> RawNode {
    RawNode {
        children: Some(children),
        ..RawNode::folder(id, id.to_uppercase())
    }
}

pub fn leaf(id: &str) -> RawNode {
    RawNode::new(id, id.to_uppercase())
}

/// ```text
/// a            (loaded)
/// ├── a1
/// └── a2       (loaded)
///     └── a2x
/// b
/// c            (declared folder, never fetched)
/// ```
pub fn sample_tree() -> Tree {
    Tree::from_raw(sample_forest())
}

/// The descriptors behind [sample_tree], for feeding a [crate::source::MemorySource].
pub fn sample_forest() -> Vec<RawNode> {
    vec![
        loaded("a", vec![leaf("a1"), loaded("a2", vec![leaf("a2x")])]),
        leaf("b"),
        RawNode::folder("c", "C"),
    ]
}

/// Looks a node up by walking loaded children; panics when absent.
pub fn node(tree: &Tree, id: &str) -> NodeRef {
    crate::tree::find_node_and_path(tree, &NodeId::from(id))
        .map(|(n, _)| n)
        .unwrap_or_else(|| panic!("node '{id}' not in tree"))
}

pub fn child_ids(node: &NodeRef) -> Vec<String> {
    node.children
        .loaded()
        .unwrap_or(&[])
        .iter()
        .map(|c| c.id.to_string())
        .collect()
}

pub fn ids(rows: &[FlatNode]) -> Vec<String> {
    rows.iter().map(|r| r.id.to_string()).collect()
}

pub fn same(a: &NodeRef, b: &NodeRef) -> bool {
    Arc::ptr_eq(a, b)
}
