//! The activity graph: static structure of a protocol.
//!
//! Nodes and edges are defined before execution begins and never
//! change during a run. Declaration order is meaningful: decision
//! guards are tried in edge declaration order, and the engine fires
//! simultaneously-ready nodes in a deterministic order derived from
//! token arrival.

use crate::{
    ActivityEdge, ActivityNode, ExecutionError, ExecutionResult, NodeId, NodeKind,
    ParameterDirection,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An activity graph: nodes plus control/object flow edges
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityGraph {
    /// Human-readable name
    pub name: String,
    /// Nodes in declaration order
    pub nodes: Vec<ActivityNode>,
    /// Edges in declaration order
    pub edges: Vec<ActivityEdge>,
}

impl ActivityGraph {
    /// Create an empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    // ── Construction ─────────────────────────────────────────────────

    /// Add a node to the graph
    pub fn add_node(&mut self, node: ActivityNode) -> ExecutionResult<()> {
        if self.nodes.iter().any(|n| n.id == node.id) {
            return Err(ExecutionError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Add an edge to the graph
    pub fn add_edge(&mut self, edge: ActivityEdge) -> ExecutionResult<()> {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(ExecutionError::DuplicateEdge(edge.id));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains_node(endpoint) {
                return Err(ExecutionError::EdgeEndpointNotFound {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Check if the graph contains a node
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    /// Get a node by ID
    pub fn node(&self, id: &NodeId) -> Option<&ActivityNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Get a node by ID, erroring if absent
    pub fn require_node(&self, id: &NodeId) -> ExecutionResult<&ActivityNode> {
        self.node(id)
            .ok_or_else(|| ExecutionError::NodeNotFound(id.clone()))
    }

    /// Declaration index of a node
    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    /// Edges whose target is the given node
    pub fn incoming_edges(&self, id: &NodeId) -> Vec<&ActivityEdge> {
        self.edges.iter().filter(|e| &e.target == id).collect()
    }

    /// Edges whose source is the given node
    pub fn outgoing_edges(&self, id: &NodeId) -> Vec<&ActivityEdge> {
        self.edges.iter().filter(|e| &e.source == id).collect()
    }

    /// Outgoing edges of a call, including edges leaving its pins.
    ///
    /// Object flows leave a call through its output pins; a call's
    /// effective out-edge set therefore spans the call node and every
    /// pin it owns.
    pub fn call_outgoing_edges(&self, call: &NodeId) -> Vec<&ActivityEdge> {
        self.edges
            .iter()
            .filter(|e| {
                &e.source == call
                    || self
                        .node(&e.source)
                        .and_then(|n| n.pin_owner())
                        .is_some_and(|owner| owner == call)
            })
            .collect()
    }

    /// All pins owned by a call, in declaration order
    pub fn pins_of(&self, call: &NodeId) -> Vec<&ActivityNode> {
        self.nodes
            .iter()
            .filter(|n| n.pin_owner() == Some(call))
            .collect()
    }

    /// Input-side pins (input and value pins) owned by a call
    pub fn input_pins(&self, call: &NodeId) -> Vec<&ActivityNode> {
        self.pins_of(call)
            .into_iter()
            .filter(|n| {
                matches!(
                    n.kind,
                    NodeKind::InputPin { .. } | NodeKind::ValuePin { .. }
                )
            })
            .collect()
    }

    /// Output pins owned by a call
    pub fn output_pins(&self, call: &NodeId) -> Vec<&ActivityNode> {
        self.pins_of(call)
            .into_iter()
            .filter(|n| matches!(n.kind, NodeKind::OutputPin { .. }))
            .collect()
    }

    /// The unique input-side pin of a call with the given name
    pub fn input_pin(&self, call: &NodeId, pin: &str) -> ExecutionResult<&ActivityNode> {
        Self::unique_pin(self.input_pins(call), call, pin)
    }

    /// The unique output pin of a call with the given name
    pub fn output_pin(&self, call: &NodeId, pin: &str) -> ExecutionResult<&ActivityNode> {
        Self::unique_pin(self.output_pins(call), call, pin)
    }

    fn unique_pin<'a>(
        pins: Vec<&'a ActivityNode>,
        call: &NodeId,
        pin: &str,
    ) -> ExecutionResult<&'a ActivityNode> {
        let mut matches = pins.into_iter().filter(|n| n.pin_name() == Some(pin));
        let first = matches.next();
        let second = matches.next();
        match (first, second) {
            (Some(node), None) => Ok(node),
            _ => Err(ExecutionError::PinNotFound {
                call: call.clone(),
                pin: pin.to_string(),
            }),
        }
    }

    /// Nodes that start a run: initial nodes and input parameter nodes,
    /// in declaration order.
    pub fn initiating_nodes(&self) -> Vec<&ActivityNode> {
        self.nodes
            .iter()
            .filter(|n| {
                matches!(
                    n.kind,
                    NodeKind::Initial
                        | NodeKind::ActivityParameter {
                            direction: ParameterDirection::In,
                            ..
                        }
                )
            })
            .collect()
    }

    /// Output parameter nodes of this graph
    pub fn output_parameter_nodes(&self) -> Vec<&ActivityNode> {
        self.nodes
            .iter()
            .filter(|n| {
                matches!(
                    n.kind,
                    NodeKind::ActivityParameter {
                        direction: ParameterDirection::Out,
                        ..
                    }
                )
            })
            .collect()
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validate the graph for structural correctness.
    ///
    /// Checked before execution so the engine can assume edges resolve
    /// and pins have call owners.
    pub fn validate(&self) -> ExecutionResult<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(ExecutionError::DuplicateNode(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !self.contains_node(endpoint) {
                    return Err(ExecutionError::EdgeEndpointNotFound {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        for node in &self.nodes {
            if let Some(owner) = node.pin_owner() {
                let owner_node = self.require_node(owner)?;
                if !matches!(owner_node.kind, NodeKind::Call { .. }) {
                    return Err(ExecutionError::Structural(format!(
                        "pin {} is owned by non-call node {}",
                        node.id, owner
                    )));
                }
            }

            if let NodeKind::Decision {
                decision_input_flow,
                ..
            } = &node.kind
            {
                let outgoing = self.outgoing_edges(&node.id);
                let else_count = outgoing.iter().filter(|e| e.is_else()).count();
                if else_count > 1 {
                    return Err(ExecutionError::Structural(format!(
                        "decision {} has {} else edges",
                        node.id, else_count
                    )));
                }
                if let Some(flow) = decision_input_flow {
                    let valid = self
                        .edges
                        .iter()
                        .any(|e| &e.id == flow && e.target == node.id);
                    if !valid {
                        return Err(ExecutionError::Structural(format!(
                            "decision {} names decision input flow {} that does not target it",
                            node.id, flow
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
