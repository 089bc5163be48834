//! Fetch collaborators: where node data comes from.
//!
//! The engine never reads data on its own. It asks a [NodeSource] for the top-level nodes once and
//! for the children of a node the first time that node is expanded.

use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use crate::{
    error::TreeError,
    properties::{NodeId, RawNode},
};

pub trait NodeSource: Sync {
    fn fetch_top_level_nodes(
        &self,
    ) -> impl Future<Output = Result<Vec<RawNode>, TreeError>> + Send;

    /// Children of `parent`. Returned descriptors must not carry their own children.
    fn fetch_children_for_node(
        &self,
        parent: NodeId,
    ) -> impl Future<Output = Result<Vec<RawNode>, TreeError>> + Send;
}

/// A [NodeSource] serving a fully known forest from memory.
///
/// It hands nodes out one level at a time, exactly like a remote source would, and records how
/// often it was asked. Individual ids can be made to fail and every fetch can be delayed, which is
/// what the orchestration tests rely on.
#[derive(Debug, Default)]
pub struct MemorySource {
    top_level: Vec<RawNode>,
    children: BTreeMap<NodeId, Vec<RawNode>>,
    failing: Mutex<BTreeSet<NodeId>>,
    delays: Mutex<BTreeMap<NodeId, Duration>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(forest: Vec<RawNode>) -> MemorySource {
        let mut children = BTreeMap::new();
        let mut stack: Vec<RawNode> = forest.clone();
        while let Some(node) = stack.pop() {
            if let Some(list) = &node.children {
                children.insert(node.id.clone(), list.iter().map(RawNode::detached).collect());
                stack.extend(list.iter().cloned());
            }
        }
        MemorySource {
            top_level: forest.iter().map(RawNode::detached).collect(),
            children,
            ..Default::default()
        }
    }

    /// Parses a JSON array of nested node descriptors.
    pub fn from_json_str(json: &str) -> Result<MemorySource, TreeError> {
        let forest: Vec<RawNode> = serde_json::from_str(json)?;
        Ok(MemorySource::new(forest))
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<MemorySource, TreeError> {
        tracing::debug!("Reading tree from {:?}", path.as_ref());
        let json = tokio::fs::read_to_string(path).await?;
        MemorySource::from_json_str(&json)
    }

    /// Makes every later fetch for `id` (children) fail.
    pub fn fail_on(&self, id: impl Into<NodeId>) {
        self.failing.lock().insert(id.into());
    }

    pub fn recover(&self, id: &NodeId) {
        self.failing.lock().remove(id);
    }

    /// Delays the children fetch for `id` by `delay`.
    pub fn delay(&self, id: impl Into<NodeId>, delay: Duration) {
        self.delays.lock().insert(id.into(), delay);
    }

    /// Number of fetch calls served so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl NodeSource for MemorySource {
    fn fetch_top_level_nodes(
        &self,
    ) -> impl Future<Output = Result<Vec<RawNode>, TreeError>> + Send {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = Ok(self.top_level.clone());
        async move { result }
    }

    fn fetch_children_for_node(
        &self,
        parent: NodeId,
    ) -> impl Future<Output = Result<Vec<RawNode>, TreeError>> + Send {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().get(&parent).copied();
        let result = if self.failing.lock().contains(&parent) {
            Err(TreeError::Fetch(format!("children of '{parent}' unavailable")))
        } else {
            Ok(self.children.get(&parent).cloned().unwrap_or_default())
        };
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{leaf, loaded};
    use test_log::test;

    #[test(tokio::test)]
    async fn test_memory_source_serves_one_level_at_a_time() {
        let source = MemorySource::new(vec![
            loaded("a", vec![leaf("a1"), loaded("a2", vec![leaf("a2x")])]),
            leaf("b"),
        ]);
        let top = source.fetch_top_level_nodes().await.unwrap();
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|n| n.children.is_none()));

        let a = source.fetch_children_for_node("a".into()).await.unwrap();
        assert_eq!(a.len(), 2);
        assert!(a[1].has_children);
        assert!(a[1].children.is_none());

        let b = source.fetch_children_for_node("b".into()).await.unwrap();
        assert!(b.is_empty());
        assert_eq!(source.fetch_count(), 3);
    }

    #[test(tokio::test)]
    async fn test_memory_source_failure_injection() {
        let source = MemorySource::new(vec![loaded("a", vec![leaf("a1")])]);
        source.fail_on("a");
        let err = source.fetch_children_for_node("a".into()).await.unwrap_err();
        assert!(matches!(err, TreeError::Fetch(_)));
        source.recover(&"a".into());
        assert!(source.fetch_children_for_node("a".into()).await.is_ok());
    }

    #[test(tokio::test)]
    async fn test_memory_source_from_json() {
        let source = MemorySource::from_json_str(
            r#"[{"id": "docs", "name": "Docs", "hasChildren": true,
                 "children": [{"id": "readme", "name": "README.md", "type": "file"}]}]"#,
        )
        .unwrap();
        let children = source
            .fetch_children_for_node("docs".into())
            .await
            .unwrap();
        assert_eq!(children[0].kind.as_deref(), Some("file"));

        assert!(MemorySource::from_json_str("{not json").is_err());
    }
}
