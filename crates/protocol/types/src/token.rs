//! Tokens: the immutable unit of progress.
//!
//! A token travels a graph edge, hops from a pin to its owning call,
//! or seeds an entry node. Once created it never changes; firing a
//! node consumes tokens (removes them from the pending pool) and
//! produces new ones. Every token ever produced stays in the
//! execution's token pool for replay.

use crate::{EdgeId, Literal, NodeId, RecordId};
use serde::{Deserialize, Serialize};

/// Unique identifier for a token, sequential within one run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// What a token travels along
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowLink {
    /// A graph edge (or a synthesized invocation edge)
    Edge(EdgeId),
    /// Pin-to-owner hop: feeds a call's input from its own pin,
    /// with no graph edge for the hop
    Pin {
        /// The source pin
        pin: NodeId,
        /// The pin's owning call
        owner: NodeId,
    },
    /// Externally supplied start token for an entry node
    Seed {
        /// The entry node this token enables
        target: NodeId,
    },
}

/// A token: a value in flight toward a target node
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeFlow {
    /// Unique identifier within the run
    pub id: TokenId,
    /// The edge, pin hop, or seed this token travels
    pub link: FlowLink,
    /// The node this token enables (resolved at creation)
    pub target: NodeId,
    /// The record that produced this token (None for seeds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_record: Option<RecordId>,
    /// The value carried
    pub value: Literal,
}

impl EdgeFlow {
    /// Create a token traveling an edge
    pub fn on_edge(
        id: TokenId,
        edge: EdgeId,
        target: NodeId,
        source_record: RecordId,
        value: Literal,
    ) -> Self {
        Self {
            id,
            link: FlowLink::Edge(edge),
            target,
            source_record: Some(source_record),
            value,
        }
    }

    /// Create a pin-to-owner token
    pub fn on_pin(id: TokenId, pin: NodeId, owner: NodeId, source_record: RecordId, value: Literal) -> Self {
        Self {
            id,
            link: FlowLink::Pin {
                pin,
                owner: owner.clone(),
            },
            target: owner,
            source_record: Some(source_record),
            value,
        }
    }

    /// Create a seed token for an entry node
    pub fn seed(id: TokenId, target: NodeId) -> Self {
        Self {
            id,
            link: FlowLink::Seed {
                target: target.clone(),
            },
            target,
            source_record: None,
            value: Literal::Null,
        }
    }

    /// The edge this token travels, if any
    pub fn edge(&self) -> Option<&EdgeId> {
        match &self.link {
            FlowLink::Edge(e) => Some(e),
            _ => None,
        }
    }

    /// The source pin, if this is a pin-to-owner token
    pub fn source_pin(&self) -> Option<&NodeId> {
        match &self.link {
            FlowLink::Pin { pin, .. } => Some(pin),
            _ => None,
        }
    }

    /// Check if this is a seed token
    pub fn is_seed(&self) -> bool {
        matches!(self.link, FlowLink::Seed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_token() {
        let t = EdgeFlow::on_edge(
            TokenId(0),
            EdgeId::new("e1"),
            NodeId::new("step"),
            RecordId(0),
            Literal::string("v"),
        );
        assert_eq!(t.edge(), Some(&EdgeId::new("e1")));
        assert_eq!(t.target, NodeId::new("step"));
        assert!(!t.is_seed());
    }

    #[test]
    fn test_pin_token_targets_owner() {
        let t = EdgeFlow::on_pin(
            TokenId(1),
            NodeId::new("step.source"),
            NodeId::new("step"),
            RecordId(2),
            Literal::integer(5),
        );
        assert_eq!(t.target, NodeId::new("step"));
        assert_eq!(t.source_pin(), Some(&NodeId::new("step.source")));
        assert!(t.edge().is_none());
    }

    #[test]
    fn test_seed_token() {
        let t = EdgeFlow::seed(TokenId(2), NodeId::new("start"));
        assert!(t.is_seed());
        assert!(t.source_record.is_none());
        assert!(t.value.is_null());
    }
}
