//! Activity edges: control and object flows.
//!
//! Control flow carries the bare right-to-proceed; object flow carries
//! a value. Object edges leaving a decision node may carry a guard,
//! and at most one of them may be the distinguished else edge.

use crate::{Literal, NodeId};
use serde::{Deserialize, Serialize};

/// Unique identifier for an activity edge
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an edge carries control or a value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// The bare right-to-proceed
    ControlFlow,
    /// A value moving between nodes or pins
    ObjectFlow,
}

/// A guard on an object edge leaving a decision node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Guard {
    /// Taken when the decision value equals this literal
    Literal(Literal),
    /// Taken when no literal guard matches
    Else,
}

/// An edge in an activity graph
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityEdge {
    /// Unique identifier
    pub id: EdgeId,
    /// Control or object flow
    pub kind: EdgeKind,
    /// Source node or pin
    pub source: NodeId,
    /// Target node or pin
    pub target: NodeId,
    /// Guard, for object edges leaving a decision node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<Guard>,
}

impl ActivityEdge {
    /// Create a control-flow edge
    pub fn control(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: EdgeId::new(id),
            kind: EdgeKind::ControlFlow,
            source: NodeId::new(source),
            target: NodeId::new(target),
            guard: None,
        }
    }

    /// Create an object-flow edge
    pub fn object(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: EdgeId::new(id),
            kind: EdgeKind::ObjectFlow,
            source: NodeId::new(source),
            target: NodeId::new(target),
            guard: None,
        }
    }

    /// Attach a literal guard
    pub fn with_guard(mut self, guard: impl Into<Literal>) -> Self {
        self.guard = Some(Guard::Literal(guard.into()));
        self
    }

    /// Mark this as the distinguished else edge
    pub fn with_else_guard(mut self) -> Self {
        self.guard = Some(Guard::Else);
        self
    }

    /// Check if this is the else edge of a decision
    pub fn is_else(&self) -> bool {
        matches!(self.guard, Some(Guard::Else))
    }

    /// Check if this is an object-flow edge
    pub fn is_object_flow(&self) -> bool {
        self.kind == EdgeKind::ObjectFlow
    }

    /// Check if this is a control-flow edge
    pub fn is_control_flow(&self) -> bool {
        self.kind == EdgeKind::ControlFlow
    }

    /// The guard literal, if a literal guard is attached
    pub fn guard_literal(&self) -> Option<&Literal> {
        match &self.guard {
            Some(Guard::Literal(l)) => Some(l),
            _ => None,
        }
    }
}
