use crate::properties::{NodeId, NodeRef};

use super::Tree;

/// Depth-first search for `id`.
///
/// Returns the node and the ids of its ancestors ordered from the top level down, excluding the
/// node itself. Only loaded children are searched.
pub fn find_node_and_path(tree: &Tree, id: &NodeId) -> Option<(NodeRef, Vec<NodeId>)> {
    let mut path = Vec::new();
    find_in(tree.roots(), id, &mut path).map(|node| (node, path))
}

fn find_in(nodes: &[NodeRef], id: &NodeId, path: &mut Vec<NodeId>) -> Option<NodeRef> {
    for node in nodes {
        if &node.id == id {
            return Some(node.clone());
        }
        if let Some(children) = node.children.non_empty() {
            path.push(node.id.clone());
            if let Some(found) = find_in(children, id, path) {
                return Some(found);
            }
            path.pop();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::sample_tree;
    use test_log::test;

    #[test]
    fn test_find_top_level_has_empty_path() {
        let (node, path) = find_node_and_path(&sample_tree(), &"b".into()).unwrap();
        assert_eq!(node.id, NodeId::from("b"));
        assert!(path.is_empty());
    }

    #[test]
    fn test_find_nested_returns_ancestor_chain() {
        let (node, path) = find_node_and_path(&sample_tree(), &"a2x".into()).unwrap();
        assert_eq!(node.name, "A2X");
        assert_eq!(path, vec![NodeId::from("a"), NodeId::from("a2")]);
    }

    #[test]
    fn test_find_missing_and_unloaded() {
        let tree = sample_tree();
        assert!(find_node_and_path(&tree, &"nope".into()).is_none());
        assert!(find_node_and_path(&tree, &"c1".into()).is_none());
    }
}
