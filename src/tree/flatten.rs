use std::{collections::BTreeSet, sync::Arc};

use crate::properties::{FlatNode, IdSet, NodeId, NodeRef};

use super::Tree;

/// Projects the tree into its visible rows, in pre-order.
///
/// A node's children follow it only when the node is open and its children are loaded and
/// non-empty, so the cost is proportional to the number of visible rows rather than the size of
/// the tree.
pub fn flatten(tree: &Tree, open: &BTreeSet<NodeId>, loading: &BTreeSet<NodeId>) -> Vec<FlatNode> {
    let mut rows = Vec::new();
    push_rows(tree.roots(), 0, open, loading, &mut rows);
    rows
}

fn push_rows(
    nodes: &[NodeRef],
    depth: usize,
    open: &BTreeSet<NodeId>,
    loading: &BTreeSet<NodeId>,
    rows: &mut Vec<FlatNode>,
) {
    for node in nodes {
        let is_open = open.contains(&node.id);
        rows.push(FlatNode {
            id: node.id.clone(),
            depth,
            has_children: node.effective_has_children(),
            is_loaded: node.is_loaded(),
            is_loading: loading.contains(&node.id),
            is_open,
            node: node.clone(),
        });
        if is_open {
            if let Some(children) = node.children.non_empty() {
                push_rows(children, depth + 1, open, loading, rows);
            }
        }
    }
}

/// Memoizes [flatten] on the identities of its three inputs.
#[derive(Debug, Default)]
pub struct FlatCache {
    entry: Option<(Tree, IdSet, IdSet, Arc<Vec<FlatNode>>)>,
}

impl FlatCache {
    pub fn get(&mut self, tree: &Tree, open: &IdSet, loading: &IdSet) -> Arc<Vec<FlatNode>> {
        if let Some((t, o, l, rows)) = &self.entry {
            if t.ptr_eq(tree) && Arc::ptr_eq(o, open) && Arc::ptr_eq(l, loading) {
                return rows.clone();
            }
        }
        let rows = Arc::new(flatten(tree, open, loading));
        tracing::trace!("[FlatCache] recomputed {} visible rows", rows.len());
        self.entry = Some((tree.clone(), open.clone(), loading.clone(), rows.clone()));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{ids, sample_tree};
    use test_log::test;

    fn set(items: &[&str]) -> BTreeSet<NodeId> {
        items.iter().map(|s| NodeId::from(*s)).collect()
    }

    #[test]
    fn test_nothing_open_yields_top_level() {
        let rows = flatten(&sample_tree(), &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "b", "c"]);
        assert!(rows.iter().all(|r| r.depth == 0 && !r.is_open));
    }

    #[test]
    fn test_open_nodes_emit_children_depth_first() {
        let rows = flatten(&sample_tree(), &set(&["a", "a2"]), &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "a1", "a2", "a2x", "b", "c"]);
        let depths: Vec<usize> = rows.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2, 0, 0]);
    }

    #[test]
    fn test_open_descendant_under_closed_parent_stays_hidden() {
        let rows = flatten(&sample_tree(), &set(&["a2"]), &BTreeSet::new());
        assert_eq!(ids(&rows), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_open_unloaded_node_shows_loading_flag_only() {
        let rows = flatten(&sample_tree(), &set(&["c"]), &set(&["c"]));
        let c = rows.iter().find(|r| r.id == NodeId::from("c")).unwrap();
        assert!(c.is_open);
        assert!(c.is_loading);
        assert!(!c.is_loaded);
        assert!(c.has_children);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let tree = sample_tree();
        let open = set(&["a"]);
        assert_eq!(
            flatten(&tree, &open, &BTreeSet::new()),
            flatten(&tree, &open, &BTreeSet::new())
        );
    }

    #[test]
    fn test_cache_reuses_rows_until_an_input_changes() {
        let tree = sample_tree();
        let open: IdSet = Arc::new(set(&["a"]));
        let loading: IdSet = Arc::default();
        let mut cache = FlatCache::default();

        let first = cache.get(&tree, &open, &loading);
        assert!(Arc::ptr_eq(&first, &cache.get(&tree, &open, &loading)));

        // Equal contents, different identity: recompute.
        let reopened: IdSet = Arc::new(set(&["a"]));
        let second = cache.get(&tree, &reopened, &loading);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }
}
