use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::properties::NodeId;

/// Coarse classification of a [TreeError], used by callers that only need to know which family of
/// failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request was well-formed but violates a structural rule of the tree.
    Validation,
    /// The request referenced an id that is not in the tree.
    NotFound,
    /// A fetch collaborator rejected the request.
    Fetch,
    /// Configuration, IO, serialization, or state-machine misuse.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TreeError {
    #[error("Cannot move node '{0}' into itself")]
    SelfMove(NodeId),
    #[error("Cannot move node '{node}' into its own descendant '{target}'")]
    CyclicMove { node: NodeId, target: NodeId },
    #[error("Target '{0}' must be expanded first before nodes can be moved into it")]
    TargetNotLoaded(NodeId),
    #[error("Parent '{0}' must be expanded first before children can be added to it")]
    ParentNotLoaded(NodeId),
    #[error("A node with id '{0}' already exists")]
    DuplicateId(NodeId),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Invalid Command: {0}")]
    Command(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl TreeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::SelfMove(_) => ErrorKind::Validation,
            TreeError::CyclicMove { .. } => ErrorKind::Validation,
            TreeError::TargetNotLoaded(_) => ErrorKind::Validation,
            TreeError::ParentNotLoaded(_) => ErrorKind::Validation,
            TreeError::DuplicateId(_) => ErrorKind::Validation,
            TreeError::NotFound(_) => ErrorKind::NotFound,
            TreeError::Fetch(_) => ErrorKind::Fetch,
            TreeError::Command(_) => ErrorKind::Internal,
            TreeError::Config(_) => ErrorKind::Internal,
            TreeError::Io(_) => ErrorKind::Internal,
            TreeError::Serialization(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(id: &NodeId) -> TreeError {
        TreeError::NotFound(format!("node '{id}'"))
    }
}

impl From<toml::de::Error> for TreeError {
    fn from(src: toml::de::Error) -> TreeError {
        TreeError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for TreeError {
    fn from(src: toml::ser::Error) -> TreeError {
        TreeError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for TreeError {
    fn from(src: JsonError) -> TreeError {
        TreeError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for TreeError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => TreeError::NotFound(format!("{x}")),
            _ => TreeError::Io(format!("IOError: {}", x.kind())),
        }
    }
}
