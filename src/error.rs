//! Crate-wide error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(u64),

    #[error("Invalid node id ({0})")]
    InvalidNodeId(String),

    #[error("Unknown edge type: {0}")]
    UnknownType(String),

    #[error("Unknown queryset: {0}")]
    UnknownSet(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    #[error("Invalid parameter count (got {got}), should be {expected}")]
    Arity { got: usize, expected: usize },

    #[error("Source node not in graph")]
    SourceNotInGraph,

    #[error("Target node not in graph")]
    TargetNotInGraph,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}
