//! Error types for protocol execution.
//!
//! Structural and missing-parameter errors abort a run immediately.
//! Specialization failures are recovered locally by the engine and
//! never surface from a run. A stuck graph is not an error at all;
//! it is reported through the execution's completion flag.

use crate::{BehaviorId, EdgeId, NodeId};

/// Errors that can occur while building or executing a protocol
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Duplicate node ID: {0}")]
    DuplicateNode(NodeId),

    #[error("Duplicate edge ID: {0}")]
    DuplicateEdge(EdgeId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge {edge} references unknown node {node}")]
    EdgeEndpointNotFound { edge: EdgeId, node: NodeId },

    #[error("Behavior not found in catalog: {0}")]
    BehaviorNotFound(BehaviorId),

    #[error("Duplicate behavior in catalog: {0}")]
    DuplicateBehavior(BehaviorId),

    #[error("Behavior {behavior} has no parameter named {parameter}")]
    ParameterNotFound {
        behavior: BehaviorId,
        parameter: String,
    },

    #[error("Behavior {behavior} has multiple parameters named {parameter}")]
    AmbiguousParameter {
        behavior: BehaviorId,
        parameter: String,
    },

    #[error("Call {call} has no unique pin named {pin}")]
    PinNotFound { call: NodeId, pin: String },

    #[error("Node {node} expected {expected} incoming token(s), had {actual}")]
    WrongInputArity {
        node: NodeId,
        expected: usize,
        actual: usize,
    },

    #[error("Do not know how to execute node {node} of kind {kind}")]
    UnsupportedNode { node: NodeId, kind: &'static str },

    #[error("Decision {node} has no matching guard and no else edge")]
    UnsatisfiableGuard { node: NodeId },

    #[error("No value or default for required parameter {parameter} at node {node}")]
    MissingParameter { node: NodeId, parameter: String },

    #[error("Malformed graph: {0}")]
    Structural(String),

    #[error("Specialization failed: {0}")]
    Specialization(String),
}

impl ExecutionError {
    /// Check if this error is in the structural (malformed graph) family
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Self::MissingParameter { .. } | Self::Specialization(_)
        )
    }
}

/// Result type alias for protocol operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ExecutionError::UnsatisfiableGuard {
            node: NodeId::new("route"),
        };
        assert!(format!("{}", err).contains("route"));
    }

    #[test]
    fn test_taxonomy() {
        assert!(ExecutionError::DuplicateNode(NodeId::new("n")).is_structural());
        assert!(!ExecutionError::MissingParameter {
            node: NodeId::new("n"),
            parameter: "p".into(),
        }
        .is_structural());
        assert!(!ExecutionError::Specialization("boom".into()).is_structural());
    }
}
