//! Activity nodes: the closed set of node kinds the engine can fire.
//!
//! Node kinds are a tagged union so the dispatcher can match
//! exhaustively; adding a kind is a compile-time-checked change,
//! not a runtime isinstance chain.

use crate::{BehaviorId, EdgeId, Literal, ParameterDirection};
use serde::{Deserialize, Serialize};

/// Unique identifier for an activity node
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in an activity graph
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityNode {
    /// Unique identifier within the run
    pub id: NodeId,
    /// Node kind and kind-specific data
    pub kind: NodeKind,
}

/// The closed set of activity node kinds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry point, fired once from its external seed token
    Initial,
    /// Terminates one branch of flow without ending the activity
    FlowFinal,
    /// Terminates the activity; fires as soon as *any* incoming edge
    /// has a token
    Final,
    /// Duplicates its single incoming token onto every outgoing edge
    Fork,
    /// Synchronizes incoming branches (representable; not executable)
    Join,
    /// Merges incoming branches (representable; not executable)
    Merge,
    /// Routes to one outgoing edge by guard evaluation
    Decision {
        /// Behavior whose return value drives guard evaluation, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        decision_input: Option<BehaviorId>,
        /// Edge explicitly marked as the node's decision input, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        decision_input_flow: Option<EdgeId>,
    },
    /// Boundary node binding a graph parameter to the flow
    ActivityParameter {
        /// Name of the owning behavior's parameter
        parameter: String,
        /// Parameter direction
        direction: ParameterDirection,
    },
    /// Invokes a behavior, a primitive or a sub-protocol
    Call {
        /// The behavior to invoke
        behavior: BehaviorId,
    },
    /// Input pin owned by a call, fed by an object edge
    InputPin {
        /// The owning call node
        owner: NodeId,
        /// Pin name; matches a parameter of the call's behavior
        pin: String,
    },
    /// Output pin owned by a call, source of outgoing object edges
    OutputPin {
        /// The owning call node
        owner: NodeId,
        /// Pin name; matches a parameter of the call's behavior
        pin: String,
    },
    /// Input pin carrying a literal instead of receiving a token
    ValuePin {
        /// The owning call node
        owner: NodeId,
        /// Pin name; matches a parameter of the call's behavior
        pin: String,
        /// The literal this pin supplies
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Literal>,
    },
}

impl ActivityNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            kind,
        }
    }

    /// Create an initial node
    pub fn initial(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Initial)
    }

    /// Create a flow-final node
    pub fn flow_final(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::FlowFinal)
    }

    /// Create a final node
    pub fn final_node(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Final)
    }

    /// Create a fork node
    pub fn fork(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Fork)
    }

    /// Create a join node
    pub fn join(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Join)
    }

    /// Create a merge node
    pub fn merge(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Merge)
    }

    /// Create a decision node with no decision-input behavior or flow
    pub fn decision(id: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Decision {
                decision_input: None,
                decision_input_flow: None,
            },
        )
    }

    /// Create an input activity-parameter node
    pub fn input_parameter(id: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::ActivityParameter {
                parameter: parameter.into(),
                direction: ParameterDirection::In,
            },
        )
    }

    /// Create an output activity-parameter node
    pub fn output_parameter(id: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::ActivityParameter {
                parameter: parameter.into(),
                direction: ParameterDirection::Out,
            },
        )
    }

    /// Create a call node
    pub fn call(id: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Call {
                behavior: BehaviorId::new(behavior),
            },
        )
    }

    /// Create an input pin owned by a call
    pub fn input_pin(
        id: impl Into<String>,
        owner: impl Into<String>,
        pin: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            NodeKind::InputPin {
                owner: NodeId::new(owner),
                pin: pin.into(),
            },
        )
    }

    /// Create an output pin owned by a call
    pub fn output_pin(
        id: impl Into<String>,
        owner: impl Into<String>,
        pin: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            NodeKind::OutputPin {
                owner: NodeId::new(owner),
                pin: pin.into(),
            },
        )
    }

    /// Create a value pin carrying a literal
    pub fn value_pin(
        id: impl Into<String>,
        owner: impl Into<String>,
        pin: impl Into<String>,
        value: impl Into<Literal>,
    ) -> Self {
        Self::new(
            id,
            NodeKind::ValuePin {
                owner: NodeId::new(owner),
                pin: pin.into(),
                value: Some(value.into()),
            },
        )
    }

    /// Set the decision-input behavior (decision nodes only)
    pub fn with_decision_input(mut self, behavior: impl Into<String>) -> Self {
        if let NodeKind::Decision { decision_input, .. } = &mut self.kind {
            *decision_input = Some(BehaviorId::new(behavior));
        }
        self
    }

    /// Set the decision-input flow edge (decision nodes only)
    pub fn with_decision_input_flow(mut self, edge: EdgeId) -> Self {
        if let NodeKind::Decision {
            decision_input_flow,
            ..
        } = &mut self.kind
        {
            *decision_input_flow = Some(edge);
        }
        self
    }

    /// Check if this node is any kind of pin
    pub fn is_pin(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::InputPin { .. } | NodeKind::OutputPin { .. } | NodeKind::ValuePin { .. }
        )
    }

    /// The owning call node, if this node is a pin
    pub fn pin_owner(&self) -> Option<&NodeId> {
        match &self.kind {
            NodeKind::InputPin { owner, .. }
            | NodeKind::OutputPin { owner, .. }
            | NodeKind::ValuePin { owner, .. } => Some(owner),
            _ => None,
        }
    }

    /// The pin name, if this node is a pin
    pub fn pin_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::InputPin { pin, .. }
            | NodeKind::OutputPin { pin, .. }
            | NodeKind::ValuePin { pin, .. } => Some(pin),
            _ => None,
        }
    }

    /// A short label for the node kind (logging and errors)
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Initial => "Initial",
            NodeKind::FlowFinal => "FlowFinal",
            NodeKind::Final => "Final",
            NodeKind::Fork => "Fork",
            NodeKind::Join => "Join",
            NodeKind::Merge => "Merge",
            NodeKind::Decision { .. } => "Decision",
            NodeKind::ActivityParameter { .. } => "ActivityParameter",
            NodeKind::Call { .. } => "Call",
            NodeKind::InputPin { .. } => "InputPin",
            NodeKind::OutputPin { .. } => "OutputPin",
            NodeKind::ValuePin { .. } => "ValuePin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let initial = ActivityNode::initial("start");
        assert!(matches!(initial.kind, NodeKind::Initial));
        assert!(!initial.is_pin());

        let call = ActivityNode::call("step1", "Pipette");
        assert_eq!(call.kind_name(), "Call");

        let pin = ActivityNode::input_pin("step1.source", "step1", "source");
        assert!(pin.is_pin());
        assert_eq!(pin.pin_owner(), Some(&NodeId::new("step1")));
        assert_eq!(pin.pin_name(), Some("source"));
    }

    #[test]
    fn test_value_pin_literal() {
        let pin = ActivityNode::value_pin("step1.volume", "step1", "volume", 25);
        match &pin.kind {
            NodeKind::ValuePin { value, .. } => {
                assert_eq!(value.as_ref().unwrap().as_integer(), Some(25));
            }
            _ => panic!("expected value pin"),
        }
    }

    #[test]
    fn test_decision_configuration() {
        let d = ActivityNode::decision("route")
            .with_decision_input("Classify")
            .with_decision_input_flow(EdgeId::new("e-input"));
        match &d.kind {
            NodeKind::Decision {
                decision_input,
                decision_input_flow,
            } => {
                assert_eq!(decision_input.as_ref().unwrap().0, "Classify");
                assert_eq!(decision_input_flow.as_ref().unwrap().0, "e-input");
            }
            _ => panic!("expected decision"),
        }
    }

    #[test]
    fn test_parameter_nodes() {
        let input = ActivityNode::input_parameter("p-in", "samples");
        match &input.kind {
            NodeKind::ActivityParameter {
                parameter,
                direction,
            } => {
                assert_eq!(parameter, "samples");
                assert_eq!(*direction, ParameterDirection::In);
            }
            _ => panic!("expected parameter node"),
        }
    }
}
