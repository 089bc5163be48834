use serde::Serialize;
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use crate::{
    error::TreeError,
    properties::{NodeId, NodeRef},
};

/// Structural changes applied by the mutation engine or the expansion orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MutationEvent {
    /// Number of top-level nodes installed.
    TopLevelLoaded(usize),
    /// Node, number of children attached
    ChildrenLoaded(NodeId, usize),
    NodeAdded {
        id: NodeId,
        parent: Option<NodeId>,
    },
    NodeRemoved(NodeId),
    NodeUpdated(NodeId),
    NodeMoved {
        id: NodeId,
        from: Option<NodeId>,
        to: Option<NodeId>,
    },
}

/// Notifications emitted by a [crate::view::TreeView].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TreeEvent {
    /// The selected node and its data, or `None` on deselection.
    Select(Option<NodeId>, Option<NodeRef>),
    /// The complete checked set after one atomic change.
    Checked(BTreeSet<NodeId>),
    Error(TreeError),
    Mutation(MutationEvent),
}

impl Display for MutationEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            MutationEvent::TopLevelLoaded(n) => write!(f, "TopLevelLoaded({n})"),
            MutationEvent::ChildrenLoaded(id, n) => write!(f, "ChildrenLoaded({id}, {n})"),
            MutationEvent::NodeAdded { id, parent } => match parent {
                Some(parent) => write!(f, "NodeAdded({id} -> {parent})"),
                None => write!(f, "NodeAdded({id} -> <root>)"),
            },
            MutationEvent::NodeRemoved(id) => write!(f, "NodeRemoved({id})"),
            MutationEvent::NodeUpdated(id) => write!(f, "NodeUpdated({id})"),
            MutationEvent::NodeMoved { id, to, .. } => match to {
                Some(to) => write!(f, "NodeMoved({id} -> {to})"),
                None => write!(f, "NodeMoved({id} -> <root>)"),
            },
        }
    }
}

impl Display for TreeEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TreeEvent::Select(Some(id), _) => write!(f, "Select({id})"),
            TreeEvent::Select(None, _) => write!(f, "Select(<none>)"),
            TreeEvent::Checked(ids) => write!(f, "Checked({} ids)", ids.len()),
            TreeEvent::Error(e) => write!(f, "Error({e})"),
            TreeEvent::Mutation(m) => write!(f, "{m}"),
        }
    }
}
