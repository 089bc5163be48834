//! Copy-on-write mutations.
//!
//! Every operation takes a [Tree] and returns a new one. Only the nodes on the path from the top
//! level to the edited node are copied; every other subtree keeps its reference identity. When
//! nothing changes the returned tree is a clone of the input handle, so [Tree::ptr_eq] against the
//! input reports the no-op.

use std::sync::Arc;

use crate::{
    error::TreeError,
    properties::{ChildrenPatch, NodeId, NodePatch, NodeRef, RawNode},
};

use super::{path::find_node_and_path, Tree};

/// Replaces the node reached by following `path` from `siblings` with the result of `edit`.
///
/// Returns `None` when the path does not resolve or `edit` declines, leaving the caller free to
/// return its input unchanged.
fn edit_at_path<F>(siblings: &[NodeRef], path: &[NodeId], edit: F) -> Option<Vec<NodeRef>>
where
    F: FnOnce(&NodeRef) -> Option<NodeRef>,
{
    let (head, rest) = path.split_first()?;
    let pos = siblings.iter().position(|n| &n.id == head)?;
    let replacement = if rest.is_empty() {
        edit(&siblings[pos])?
    } else {
        let children = siblings[pos].children.loaded()?;
        let edited = edit_at_path(children, rest, edit)?;
        Arc::new(siblings[pos].with_children(edited))
    };
    let mut next = siblings.to_vec();
    next[pos] = replacement;
    Some(next)
}

fn edit_node<F>(tree: &Tree, path: &[NodeId], edit: F) -> Tree
where
    F: FnOnce(&NodeRef) -> Option<NodeRef>,
{
    match edit_at_path(tree.roots(), path, edit) {
        Some(roots) => Tree::new(roots),
        None => tree.clone(),
    }
}

/// Appends `node` as the last child of the node at the end of `ancestor_path`, or to the top
/// level when the path is empty.
///
/// The parent's children must already be loaded; otherwise the tree is returned unchanged.
pub fn add_node_at_path(tree: &Tree, ancestor_path: &[NodeId], node: NodeRef) -> Tree {
    if ancestor_path.is_empty() {
        let mut roots = tree.roots().to_vec();
        roots.push(node);
        return Tree::new(roots);
    }
    edit_node(tree, ancestor_path, |parent| {
        let mut children = parent.children.loaded()?.to_vec();
        children.push(node);
        Some(Arc::new(parent.with_children(children)))
    })
}

/// Detaches `id` from wherever it lives.
///
/// Returns the new tree and the removed subtree. A parent left without children becomes
/// loaded-empty, never unloaded.
pub fn find_and_remove_node(tree: &Tree, id: &NodeId) -> (Tree, Option<NodeRef>) {
    let Some((node, path)) = find_node_and_path(tree, id) else {
        return (tree.clone(), None);
    };
    if path.is_empty() {
        let roots = tree
            .roots()
            .iter()
            .filter(|n| &n.id != id)
            .cloned()
            .collect();
        return (Tree::new(roots), Some(node));
    }
    let next = edit_node(tree, &path, |parent| {
        let children = parent
            .children
            .loaded()?
            .iter()
            .filter(|n| &n.id != id)
            .cloned()
            .collect();
        Some(Arc::new(parent.with_children(children)))
    });
    (next, Some(node))
}

/// Merges `patch` over the data fields of `id`. Id and children are never overwritten here.
///
/// Returns the new tree and whether the node was found.
pub fn update_node_data(tree: &Tree, id: &NodeId, patch: NodePatch) -> (Tree, bool) {
    let Some((_, mut path)) = find_node_and_path(tree, id) else {
        return (tree.clone(), false);
    };
    path.push(id.clone());
    let patch = patch.data_only();
    let next = edit_node(tree, &path, |node| Some(Arc::new(node.clone_with(patch))));
    (next, true)
}

/// Attaches freshly fetched children to `id`, the one transition from unloaded to loaded.
///
/// The node is located in `tree` as given, so results arriving out of order land on the current
/// snapshot. If the node is gone the tree is returned unchanged.
pub fn update_node_in_children(tree: &Tree, id: &NodeId, fetched: Vec<RawNode>) -> Tree {
    let Some((_, mut path)) = find_node_and_path(tree, id) else {
        tracing::debug!("[update_node_in_children] node '{id}' no longer in tree, dropping result");
        return tree.clone();
    };
    path.push(id.clone());
    let fetched = fetched.iter().map(RawNode::detached).collect();
    edit_node(tree, &path, |node| {
        Some(Arc::new(node.clone_with(NodePatch {
            children: Some(ChildrenPatch::Raw(fetched)),
            ..Default::default()
        })))
    })
}

/// Relocates `node_id` to be the last child of `target` (the top level when `None`).
///
/// Validation happens before anything is touched, in this order: no self-move, no move into the
/// node's own subtree, and the target's children must be loaded.
pub fn move_node(tree: &Tree, node_id: &NodeId, target: Option<&NodeId>) -> Result<Tree, TreeError> {
    if target == Some(node_id) {
        return Err(TreeError::SelfMove(node_id.clone()));
    }
    if find_node_and_path(tree, node_id).is_none() {
        return Err(TreeError::not_found(node_id));
    }
    if let Some(target) = target {
        let (target_node, target_ancestors) =
            find_node_and_path(tree, target).ok_or_else(|| TreeError::not_found(target))?;
        if target_ancestors.contains(node_id) {
            return Err(TreeError::CyclicMove {
                node: node_id.clone(),
                target: target.clone(),
            });
        }
        if !target_node.is_loaded() {
            return Err(TreeError::TargetNotLoaded(target.clone()));
        }
    }

    let (removed_tree, removed) = find_and_remove_node(tree, node_id);
    let node = removed.ok_or_else(|| TreeError::not_found(node_id))?;
    let target_path = match target {
        None => Vec::new(),
        Some(target) => {
            let (_, mut path) = find_node_and_path(&removed_tree, target)
                .ok_or_else(|| TreeError::not_found(target))?;
            path.push(target.clone());
            path
        }
    };
    Ok(add_node_at_path(&removed_tree, &target_path, node))
}
