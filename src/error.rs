use thiserror::Error;

use crate::model::{EdgeLabel, NodeId};

pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors surfaced by the strict apply/rollback path and engine plumbing.
///
/// Validation findings are not errors; they aggregate into
/// [`crate::validate::ValidationResult`]. Cancellation is not an error
/// either; long-running operations return partial results flagged
/// `cancelled`. A `RollbackInconsistent` error means the graph no longer
/// matches the delta being reversed and must be discarded by the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("node already exists: {0}")]
    NodeExists(NodeId),
    #[error("node does not exist: {0}")]
    MissingNode(NodeId),
    #[error("edge endpoints must exist: {from} -> {to}")]
    MissingEndpoint { from: NodeId, to: NodeId },
    #[error("edge already exists: {from} -> {to} ({label})")]
    DuplicateEdge {
        from: NodeId,
        to: NodeId,
        label: EdgeLabel,
    },
    #[error("edge not found: {from} -> {to} ({label})")]
    MissingEdge {
        from: NodeId,
        to: NodeId,
        label: EdgeLabel,
    },
    #[error("rollback inconsistency: {0}")]
    RollbackInconsistent(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
