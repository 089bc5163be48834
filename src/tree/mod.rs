//! Tree module: the immutable hierarchy and the pure algorithms over it.
//!
//! A [Tree] is a cheap, shareable handle to the ordered list of top-level nodes. Every mutation
//! produces a new handle and leaves the old one intact, so two handles can be compared by
//! reference ([Tree::ptr_eq]) to tell whether anything changed.
//!
//! # Module Organization
//!
//! - [`index`]: id → node lookup table ([NodeIndex]) and its identity-keyed cache
//! - [`path`]: locating a node together with its ancestor chain
//! - [`flatten`]: projecting the tree plus open/loading state into visible rows
//! - [`mutation`]: copy-on-write add/remove/update/move
//!
//! ```rust
//! use lazytree_core::{properties::RawNode, tree::{flatten, Tree}};
//! use std::collections::BTreeSet;
//!
//! let tree = Tree::from_raw(vec![RawNode::folder("a", "A"), RawNode::new("b", "B")]);
//! let rows = flatten(&tree, &BTreeSet::new(), &BTreeSet::new());
//! assert_eq!(rows.len(), 2);
//! ```

pub mod flatten;
pub mod index;
pub mod mutation;
pub mod path;

#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use crate::properties::{nodes_from_raw, NodeRef, RawNode};

pub use flatten::{flatten, FlatCache};
pub use index::{IndexCache, NodeIndex};
pub use mutation::{
    add_node_at_path, find_and_remove_node, move_node, update_node_data, update_node_in_children,
};
pub use path::find_node_and_path;

/// The whole hierarchy as one immutable value.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    roots: Arc<Vec<NodeRef>>,
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree({} top-level nodes)", self.roots.len())
    }
}

impl Tree {
    pub fn new(roots: Vec<NodeRef>) -> Tree {
        Tree {
            roots: Arc::new(roots),
        }
    }

    pub fn from_raw(raw: Vec<RawNode>) -> Tree {
        Tree::new(nodes_from_raw(raw))
    }

    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// True when both handles are the same tree value, i.e. no mutation happened in between.
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.roots, &other.roots)
    }
}
