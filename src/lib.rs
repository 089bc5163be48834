//! # lazytree-core
//!
//! A headless engine for hierarchical trees whose children are fetched on demand.
//!
//! ## Overview
//!
//! lazytree-core keeps an immutable tree of nodes, loads each level lazily from an asynchronous
//! [`source::NodeSource`], and layers view state on top: which nodes are open, which are loading,
//! which are checked, and which one is selected. Rendering is left to the host. What the engine
//! hands out is a flattened list of visible rows plus a stream of [`event::TreeEvent`]s.
//!
//! ### Key Features
//!
//! - **Lazy loading**: children are fetched the first time a node is expanded, never twice
//! - **Structural sharing**: every edit copies only the path from the root to the edited node
//! - **Concurrent expansion**: recursive expands fan out over siblings with a bounded fetch limit
//! - **Tri-state checkboxes**: checking cascades down through loaded children and up to ancestors
//! - **Move mode**: pick up the selected node and drop it under any loaded node or at the top level
//! - **Keyboard navigation**: next, previous, first child, parent, home and end over visible rows
//!
//! ## Architecture
//!
//! - **[`properties`]**: node descriptors, immutable nodes, flattened rows
//! - **[`tree`]**: pure algorithms over [`tree::Tree`]: lookup, flattening, path-copying edits
//! - **[`checkbox`]**: checked-set cascade and derived indeterminate state
//! - **[`navigation`]**: selection state machine and keyboard movement decisions
//! - **[`view`]**: [`view::TreeView`], the stateful command surface tying everything together
//! - **[`commands`]**: a serializable [`commands::Op`] enum for driving a view from outside
//! - **[`event`]**: notifications published by a view
//! - **[`config`]**: tunables and their TOML persistence
//!
//! ## Quick Start
//!
//! ```rust
//! use lazytree_core::{
//!     event::TreeEvent,
//!     properties::RawNode,
//!     source::MemorySource,
//!     view::TreeView,
//!     config::TreeConfig,
//! };
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), lazytree_core::TreeError> {
//!     let source = MemorySource::from_json_str(
//!         r#"[{"id": "src", "name": "src", "hasChildren": true,
//!              "children": [{"id": "main", "name": "main.rs"}]}]"#,
//!     )?;
//!     let (tx, mut rx) = unbounded_channel();
//!     let view = TreeView::new(source, TreeConfig::default(), Some(tx));
//!
//!     view.load().await?;
//!     view.expand_node(&"src".into(), false).await?;
//!     view.select_node(Some("main".into()));
//!
//!     for row in view.flat_nodes().iter() {
//!         println!("{}{}", "  ".repeat(row.depth), row.node.name);
//!     }
//!     while let Ok(event) = rx.try_recv() {
//!         if let TreeEvent::Select(Some(id), _) = event {
//!             assert_eq!(id.as_str(), "main");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `lazytree` command line tool for inspecting JSON trees

pub mod checkbox;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod navigation;
pub mod properties;
pub mod source;
#[cfg(test)]
mod tests;
pub mod tree;
pub mod view;

pub use error::*;
