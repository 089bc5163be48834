use std::{collections::BTreeMap, sync::Arc};

use crate::properties::{NodeId, NodeRef};

use super::Tree;

/// id → node lookup built by a full depth-first traversal of a [Tree].
#[derive(Debug, Default, Clone)]
pub struct NodeIndex {
    nodes: BTreeMap<NodeId, NodeRef>,
}

impl NodeIndex {
    pub fn build(tree: &Tree) -> NodeIndex {
        let mut nodes = BTreeMap::new();
        let mut stack: Vec<&NodeRef> = tree.roots().iter().rev().collect();
        while let Some(node) = stack.pop() {
            if let Some(children) = node.children.loaded() {
                stack.extend(children.iter().rev());
            }
            if nodes.insert(node.id.clone(), node.clone()).is_some() {
                tracing::warn!("[NodeIndex::build] duplicate node id '{}' in tree", node.id);
            }
        }
        NodeIndex { nodes }
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeRef> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every descendant of `id` reachable through loaded children, excluding `id` itself.
    pub fn loaded_descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let Some(node) = self.get(id) else {
            return ids;
        };
        let mut stack: Vec<&NodeRef> = node.children.loaded().unwrap_or(&[]).iter().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.id.clone());
            if let Some(children) = node.children.loaded() {
                stack.extend(children.iter());
            }
        }
        ids
    }
}

/// Holds the index of the most recently seen tree and rebuilds it only when handed a different
/// tree value.
#[derive(Debug, Default)]
pub struct IndexCache {
    entry: Option<(Tree, Arc<NodeIndex>)>,
}

impl IndexCache {
    pub fn get(&mut self, tree: &Tree) -> Arc<NodeIndex> {
        if let Some((cached, index)) = &self.entry {
            if cached.ptr_eq(tree) {
                return index.clone();
            }
        }
        let index = Arc::new(NodeIndex::build(tree));
        tracing::trace!("[IndexCache] rebuilt index with {} nodes", index.len());
        self.entry = Some((tree.clone(), index.clone()));
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::sample_tree;
    use test_log::test;

    #[test]
    fn test_index_contains_only_loaded_nodes() {
        let tree = sample_tree();
        let index = NodeIndex::build(&tree);
        // a, a1, a2, a2x, b, c; c's children are never fetched
        assert_eq!(index.len(), 6);
        assert!(index.contains(&"a2x".into()));
        assert!(!index.contains(&"c1".into()));
    }

    #[test]
    fn test_loaded_descendants() {
        let index = NodeIndex::build(&sample_tree());
        let mut ids = index.loaded_descendants(&"a".into());
        ids.sort();
        assert_eq!(ids, vec![NodeId::from("a1"), "a2".into(), "a2x".into()]);
        assert!(index.loaded_descendants(&"b".into()).is_empty());
        assert!(index.loaded_descendants(&"missing".into()).is_empty());
    }

    #[test]
    fn test_cache_is_keyed_on_tree_identity() {
        let tree = sample_tree();
        let mut cache = IndexCache::default();
        let first = cache.get(&tree);
        let again = cache.get(&tree.clone());
        assert!(Arc::ptr_eq(&first, &again));

        let other = Tree::new(tree.roots().to_vec());
        let rebuilt = cache.get(&other);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(first.len(), rebuilt.len());
    }
}
