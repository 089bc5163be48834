//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use lazytree_core::{
    config::TreeConfig,
    event::TreeEvent,
    properties::RawNode,
    source::MemorySource,
    view::TreeView,
};
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Initialize tracing for tests, respecting RUST_LOG env var.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn leaf(id: &str) -> RawNode {
    RawNode::new(id, id.to_uppercase())
}

#[allow(dead_code)]
pub fn folder(id: &str, children: Vec<RawNode>) -> RawNode {
    RawNode {
        children: Some(children),
        ..RawNode::folder(id, id.to_uppercase())
    }
}

/// ```text
/// A
/// ├── A1
/// └── A2
///     ├── A2a
///     └── A2b
/// B
/// ├── B1
/// └── B2
/// C
/// ```
#[allow(dead_code)]
pub fn forest() -> Vec<RawNode> {
    vec![
        folder("A", vec![leaf("A1"), folder("A2", vec![leaf("A2a"), leaf("A2b")])]),
        folder("B", vec![leaf("B1"), leaf("B2")]),
        leaf("C"),
    ]
}

/// A loaded view over [forest] plus the receiving end of its event stream.
#[allow(dead_code)]
pub async fn loaded_view(
    source: MemorySource,
    config: TreeConfig,
) -> (TreeView<MemorySource>, UnboundedReceiver<TreeEvent>) {
    let (tx, mut rx) = unbounded_channel();
    let view = TreeView::new(source, config, Some(tx));
    view.load().await.unwrap();
    drain(&mut rx);
    (view, rx)
}

/// Everything emitted since the last drain.
#[allow(dead_code)]
pub fn drain(rx: &mut UnboundedReceiver<TreeEvent>) -> Vec<TreeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[allow(dead_code)]
pub fn errors(events: &[TreeEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, TreeEvent::Error(_)))
        .count()
}

/// Writes [forest] as JSON into `temp_dir` and returns the file path.
#[allow(dead_code)]
pub fn write_forest(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("forest.json");
    std::fs::write(&path, serde_json::to_string_pretty(&forest()).unwrap()).unwrap();
    path
}
