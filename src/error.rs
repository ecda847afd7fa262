use thiserror::Error;

use crate::tree::NodeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("node {0:?} is not alive in the scene graph")]
    StaleNode(NodeId),
    #[error("appending {child:?} to {parent:?} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {node:?} is a child of {parent:?} and cannot be mounted as a scene root")]
    NotARoot { node: NodeId, parent: NodeId },
    #[error("node {0:?} is attached but has no director reference")]
    MissingDirector(NodeId),
    #[error("property `{property}` expects {expected} argument(s), got {got}")]
    InvalidArity {
        property: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
}

pub type Result<T> = std::result::Result<T, SceneError>;
