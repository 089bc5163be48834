//! Node model: identifiers, raw fetched descriptors, immutable tree nodes and their copy-on-write
//! helpers, and the flattened row view.
use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// Open-ended extension attributes carried by a node next to its core fields.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Keys owned by the core node fields. They never live in a [Payload]; a patch or descriptor that
/// carries them as extension attributes has them dropped.
pub const RESERVED_KEYS: [&str; 6] = ["id", "name", "hasChildren", "children", "type", "icon"];

/// Removes [RESERVED_KEYS] from an extension attribute map.
pub fn strip_reserved(mut payload: Payload) -> Payload {
    for key in RESERVED_KEYS {
        if payload.remove(key).is_some() {
            tracing::debug!("dropping reserved key '{key}' from node payload");
        }
    }
    payload
}

/// Shared handle to an immutable node. Reference identity of these handles is what the structural
/// sharing guarantees of [crate::tree::mutation] are stated in.
pub type NodeRef = Arc<TreeNode>;

/// A set of node ids whose reference identity doubles as its version: every change produces a new
/// `Arc`, so memoization can compare pointers instead of contents.
pub type IdSet = Arc<BTreeSet<NodeId>>;

/// Globally unique node identifier, as handed out by the data source.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> NodeId {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A node descriptor as delivered by a [crate::source::NodeSource].
///
/// Fetched descriptors arrive with `children` unset (never fetched) or empty. A populated
/// `children` list is accepted when constructing nodes locally, e.g. when adding a whole subtree.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "hasChildren")]
    pub has_children: bool,
    #[serde(default)]
    pub children: Option<Vec<RawNode>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl RawNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> RawNode {
        RawNode {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// A descriptor that declares children which have not been fetched yet.
    pub fn folder(id: impl Into<NodeId>, name: impl Into<String>) -> RawNode {
        RawNode {
            has_children: true,
            ..RawNode::new(id, name)
        }
    }

    /// Returns a copy without children, the shape a fetch collaborator hands out.
    pub fn detached(&self) -> RawNode {
        RawNode {
            children: None,
            ..self.clone()
        }
    }
}

/// The tri-valued children field of a [TreeNode].
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub enum Children {
    /// Never fetched.
    #[default]
    Unloaded,
    /// Fetched; possibly empty.
    Loaded(Vec<NodeRef>),
}

impl Children {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Children::Loaded(_))
    }

    /// The loaded child list, or `None` when unloaded.
    pub fn loaded(&self) -> Option<&[NodeRef]> {
        match self {
            Children::Loaded(children) => Some(children),
            Children::Unloaded => None,
        }
    }

    /// The loaded child list when it is non-empty.
    pub fn non_empty(&self) -> Option<&[NodeRef]> {
        self.loaded().filter(|c| !c.is_empty())
    }
}

/// Replacement for the children of a node during [TreeNode::clone_with].
#[derive(Debug, Clone, PartialEq)]
pub enum ChildrenPatch {
    /// Reset to the never-fetched state.
    Unloaded,
    /// Replace with nodes constructed from these descriptors.
    Raw(Vec<RawNode>),
}

/// Field overrides merged over an existing node by [TreeNode::clone_with].
///
/// `payload` entries are merged key by key over the node's payload.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePatch {
    pub id: Option<NodeId>,
    pub name: Option<String>,
    #[serde(rename = "hasChildren")]
    pub has_children: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub icon: Option<String>,
    #[serde(skip)]
    pub children: Option<ChildrenPatch>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl NodePatch {
    pub fn name(name: impl Into<String>) -> NodePatch {
        NodePatch {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Drops the overrides that only the dedicated structural operations may apply, including
    /// reserved keys that slipped into the flattened payload (a JSON `"children"` key lands there
    /// because the field itself is not deserialized).
    pub fn data_only(self) -> NodePatch {
        NodePatch {
            id: None,
            children: None,
            payload: strip_reserved(self.payload),
            ..self
        }
    }
}

/// An immutable tree node. Nodes are never edited in place; every change goes through
/// [TreeNode::clone_with] or [TreeNode::with_children] and yields a new value.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    /// The data source's hint that this node has children, independent of whether they are loaded.
    pub has_children: bool,
    pub children: Children,
    pub kind: Option<String>,
    pub icon: Option<String>,
    pub payload: Payload,
}

impl From<RawNode> for TreeNode {
    fn from(raw: RawNode) -> Self {
        TreeNode::from_raw(raw)
    }
}

impl TreeNode {
    pub fn from_raw(raw: RawNode) -> TreeNode {
        let (has_children, children) = match raw.children {
            None => (raw.has_children, Children::Unloaded),
            Some(list) => (!list.is_empty(), Children::Loaded(nodes_from_raw(list))),
        };
        TreeNode {
            id: raw.id,
            name: raw.name,
            has_children,
            children,
            kind: raw.kind,
            icon: raw.icon,
            payload: strip_reserved(raw.payload),
        }
    }

    /// Converts back into a descriptor, including any loaded descendants.
    pub fn to_raw(&self) -> RawNode {
        RawNode {
            id: self.id.clone(),
            name: self.name.clone(),
            has_children: self.has_children,
            children: self
                .children
                .loaded()
                .map(|c| c.iter().map(|child| child.to_raw()).collect()),
            kind: self.kind.clone(),
            icon: self.icon.clone(),
            payload: self.payload.clone(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_loaded()
    }

    /// Declared children, or loaded children that are actually present.
    pub fn effective_has_children(&self) -> bool {
        self.has_children || self.children.non_empty().is_some()
    }

    /// Returns a new node with `patch` merged over this one.
    ///
    /// Children resolve in this order:
    /// 1. an explicit [ChildrenPatch::Unloaded] resets them, declared children defaulting to false;
    /// 2. a [ChildrenPatch::Raw] list is converted, declared children following its emptiness;
    /// 3. loaded children are kept as a fresh list of the same child handles;
    /// 4. otherwise they stay unloaded with the declared flag preserved.
    pub fn clone_with(&self, patch: NodePatch) -> TreeNode {
        let (has_children, children) = match patch.children {
            Some(ChildrenPatch::Unloaded) => {
                (patch.has_children.unwrap_or(false), Children::Unloaded)
            }
            Some(ChildrenPatch::Raw(list)) => {
                (!list.is_empty(), Children::Loaded(nodes_from_raw(list)))
            }
            None => (
                patch.has_children.unwrap_or(self.has_children),
                self.children.clone(),
            ),
        };
        let mut payload = self.payload.clone();
        payload.extend(strip_reserved(patch.payload));
        TreeNode {
            id: patch.id.unwrap_or_else(|| self.id.clone()),
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            has_children,
            children,
            kind: patch.kind.or_else(|| self.kind.clone()),
            icon: patch.icon.or_else(|| self.icon.clone()),
            payload,
        }
    }

    /// Returns a new node whose children are `children`, with the declared flag following their
    /// emptiness.
    pub fn with_children(&self, children: Vec<NodeRef>) -> TreeNode {
        TreeNode {
            has_children: !children.is_empty(),
            children: Children::Loaded(children),
            ..self.shallow()
        }
    }

    fn shallow(&self) -> TreeNode {
        TreeNode {
            id: self.id.clone(),
            name: self.name.clone(),
            has_children: self.has_children,
            children: Children::Unloaded,
            kind: self.kind.clone(),
            icon: self.icon.clone(),
            payload: self.payload.clone(),
        }
    }
}

pub fn nodes_from_raw(raw: Vec<RawNode>) -> Vec<NodeRef> {
    raw.into_iter()
        .map(|r| Arc::new(TreeNode::from_raw(r)))
        .collect()
}

/// One visible row of the flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatNode {
    pub id: NodeId,
    /// Zero for top-level nodes.
    pub depth: usize,
    /// Declared children, or loaded and non-empty.
    pub has_children: bool,
    pub is_loaded: bool,
    pub is_loading: bool,
    pub is_open: bool,
    #[serde(skip)]
    pub node: NodeRef,
}

pub(crate) fn id_set_with<I>(set: &IdSet, ids: I) -> IdSet
where
    I: IntoIterator<Item = NodeId>,
{
    let mut next = BTreeSet::clone(set);
    next.extend(ids);
    Arc::new(next)
}

pub(crate) fn id_set_without<'a, I>(set: &IdSet, ids: I) -> IdSet
where
    I: IntoIterator<Item = &'a NodeId>,
{
    let mut next = BTreeSet::clone(set);
    for id in ids {
        next.remove(id);
    }
    Arc::new(next)
}
