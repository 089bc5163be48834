use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    error::TreeError,
    navigation::Direction,
    properties::{NodeId, NodePatch, RawNode},
    source::NodeSource,
    view::TreeView,
};

/// Command interface between a host (CLI, UI shell, scripting layer) and a [TreeView].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Fetch and install the top-level nodes.
    Load,
    /// Append a node under a loaded parent, or at the top level.
    AddNode(RawNode, Option<NodeId>),
    RemoveNode(NodeId),
    UpdateNode(NodeId, NodePatch),
    GetHierarchy(NodeId),
    /// Node, recursive
    Expand(NodeId, bool),
    /// Node, recursive
    Collapse(NodeId, bool),
    /// Select a node, clear the selection, or name the move target while moving.
    Select(Option<NodeId>),
    StartMove,
    CancelMove,
    /// Complete the pending move at the top level.
    MoveToRoot,
    Navigate(Direction),
    ToggleChecked(NodeId),
    GetChecked,
    SetChecked(Vec<NodeId>),
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Op::Load => write!(f, "Load"),
            Op::AddNode(node, Some(parent)) => write!(f, "AddNode({} -> {})", node.id, parent),
            Op::AddNode(node, None) => write!(f, "AddNode({} -> <root>)", node.id),
            Op::RemoveNode(id) => write!(f, "RemoveNode({id})"),
            Op::UpdateNode(id, _) => write!(f, "UpdateNode({id})"),
            Op::GetHierarchy(id) => write!(f, "GetHierarchy({id})"),
            Op::Expand(id, recursive) => write!(f, "Expand({id}, recursive: {recursive})"),
            Op::Collapse(id, recursive) => write!(f, "Collapse({id}, recursive: {recursive})"),
            Op::Select(Some(id)) => write!(f, "Select({id})"),
            Op::Select(None) => write!(f, "Select(<none>)"),
            Op::StartMove => write!(f, "StartMove"),
            Op::CancelMove => write!(f, "CancelMove"),
            Op::MoveToRoot => write!(f, "MoveToRoot"),
            Op::Navigate(direction) => write!(f, "Navigate({direction:?})"),
            Op::ToggleChecked(id) => write!(f, "ToggleChecked({id})"),
            Op::GetChecked => write!(f, "GetChecked"),
            Op::SetChecked(ids) => write!(f, "SetChecked({} ids)", ids.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpResult {
    Ok,
    /// Outcome of a boolean command.
    Applied(bool),
    Hierarchy(Option<Vec<NodeId>>),
    Checked(Vec<NodeId>),
    Failed(TreeError),
}

impl<S: NodeSource> TreeView<S> {
    pub async fn dispatch(&self, op: Op) -> OpResult {
        tracing::debug!("[TreeView::dispatch] {op}");
        match op {
            Op::Load => match self.load().await {
                Ok(()) => OpResult::Ok,
                Err(e) => OpResult::Failed(e),
            },
            Op::AddNode(node, parent) => OpResult::Applied(self.add_node(node, parent.as_ref())),
            Op::RemoveNode(id) => OpResult::Applied(self.remove_node(&id)),
            Op::UpdateNode(id, patch) => OpResult::Applied(self.update_node(&id, patch)),
            Op::GetHierarchy(id) => OpResult::Hierarchy(self.get_node_hierarchy(&id)),
            Op::Expand(id, recursive) => match self.expand_node(&id, recursive).await {
                Ok(()) => OpResult::Ok,
                Err(e) => OpResult::Failed(e),
            },
            Op::Collapse(id, recursive) => {
                self.collapse_node(&id, recursive);
                OpResult::Ok
            }
            Op::Select(id) => {
                self.select_node(id);
                OpResult::Ok
            }
            Op::StartMove => OpResult::Applied(self.start_move()),
            Op::CancelMove => OpResult::Applied(self.cancel_move()),
            Op::MoveToRoot => OpResult::Applied(self.move_to_root()),
            Op::Navigate(direction) => {
                self.navigate(direction).await;
                OpResult::Ok
            }
            Op::ToggleChecked(id) => OpResult::Applied(self.toggle_checked(&id)),
            Op::GetChecked => OpResult::Checked(self.get_checked_nodes()),
            Op::SetChecked(ids) => {
                self.set_checked_nodes(ids);
                OpResult::Ok
            }
        }
    }
}
