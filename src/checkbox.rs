//! Tri-state checkbox cascade.
//!
//! Only the checked set is stored. Indeterminate is derived on read: a node with loaded,
//! non-empty children that is not itself checked is indeterminate when some, but not all, of its
//! direct loaded children are checked.
//!
//! Cascades only travel through loaded children. An unloaded branch keeps whatever state it had
//! until its children arrive and [inherit_into_children] or a later toggle revisits it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::{
    properties::{NodeId, TreeNode},
    tree::{find_node_and_path, NodeIndex, Tree},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckState {
    Unchecked,
    Checked,
    Indeterminate,
}

pub fn check_state(node: &TreeNode, checked: &BTreeSet<NodeId>) -> CheckState {
    if checked.contains(&node.id) {
        CheckState::Checked
    } else if is_indeterminate(node, checked) {
        CheckState::Indeterminate
    } else {
        CheckState::Unchecked
    }
}

pub fn is_indeterminate(node: &TreeNode, checked: &BTreeSet<NodeId>) -> bool {
    if checked.contains(&node.id) {
        return false;
    }
    let Some(children) = node.children.non_empty() else {
        return false;
    };
    let hits = children.iter().filter(|c| checked.contains(&c.id)).count();
    hits > 0 && hits < children.len()
}

/// Flips `id` and cascades the new value down through loaded descendants and up through the
/// ancestor chain. Returns the complete new set.
pub fn toggle(
    tree: &Tree,
    index: &NodeIndex,
    checked: &BTreeSet<NodeId>,
    id: &NodeId,
) -> BTreeSet<NodeId> {
    let target = !checked.contains(id);
    let mut next = checked.clone();
    for member in loaded_subtree(index, id) {
        if target {
            next.insert(member);
        } else {
            next.remove(&member);
        }
    }
    recompute_ancestors(tree, index, &mut next, id);
    tracing::debug!(
        "[checkbox::toggle] '{id}' -> {target}, {} ids checked",
        next.len()
    );
    next
}

/// `id` and every descendant reachable through loaded children, breadth first.
fn loaded_subtree(index: &NodeIndex, id: &NodeId) -> Vec<NodeId> {
    let mut ids = vec![id.clone()];
    let mut queue: VecDeque<&TreeNode> = index.get(id).map(|n| n.as_ref()).into_iter().collect();
    while let Some(node) = queue.pop_front() {
        for child in node.children.loaded().unwrap_or(&[]) {
            ids.push(child.id.clone());
            queue.push_back(child);
        }
    }
    ids
}

/// Re-derives membership of every ancestor of `id`, nearest first: an ancestor with loaded,
/// non-empty children is checked exactly when all of those children are.
pub fn recompute_ancestors(
    tree: &Tree,
    index: &NodeIndex,
    checked: &mut BTreeSet<NodeId>,
    id: &NodeId,
) {
    let Some((_, ancestors)) = find_node_and_path(tree, id) else {
        return;
    };
    for ancestor in ancestors.iter().rev() {
        settle(index, checked, ancestor);
    }
}

/// Like [recompute_ancestors] but also re-derives `id` itself first. Used after the children of
/// `id` changed.
pub fn recompute_chain(
    tree: &Tree,
    index: &NodeIndex,
    checked: &mut BTreeSet<NodeId>,
    id: &NodeId,
) {
    settle(index, checked, id);
    recompute_ancestors(tree, index, checked, id);
}

fn settle(index: &NodeIndex, checked: &mut BTreeSet<NodeId>, id: &NodeId) {
    let Some(children) = index.get(id).and_then(|n| n.children.non_empty()) else {
        return;
    };
    if children.iter().all(|c| checked.contains(&c.id)) {
        checked.insert(id.clone());
    } else {
        checked.remove(id);
    }
}

/// When `id` is checked, checks its freshly loaded descendants too. Returns whether the set grew.
pub fn inherit_into_children(
    index: &NodeIndex,
    checked: &mut BTreeSet<NodeId>,
    id: &NodeId,
) -> bool {
    if !checked.contains(id) {
        return false;
    }
    let before = checked.len();
    checked.extend(loaded_subtree(index, id));
    checked.len() != before
}
