//! Enablement: deciding when a node is ready to fire.
//!
//! The default rule is edge-set saturation: the distinct edges of the
//! pending tokens targeting a node must cover every incoming edge.
//! Entry nodes fire from exactly one token (their seed or invocation
//! token), final nodes fire as soon as any incoming edge delivers, and
//! calls additionally require every required input parameter to be
//! satisfiable through a pin.

use crate::catalog::BehaviorCatalog;
use protocol_types::{
    ActivityGraph, ActivityNode, EdgeFlow, EdgeId, ExecutionResult, NodeKind, ParameterValue,
};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct EnablementChecker;

impl EnablementChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check whether a node can fire given the pending tokens that
    /// target it and the parameter values bound so far.
    pub fn enabled(
        &self,
        graph: &ActivityGraph,
        node: &ActivityNode,
        pending: &[&EdgeFlow],
        bound: &[ParameterValue],
        catalog: &BehaviorCatalog,
    ) -> ExecutionResult<bool> {
        match &node.kind {
            // first delivering branch wins
            NodeKind::Final => {
                let incoming: HashSet<&EdgeId> = graph
                    .incoming_edges(&node.id)
                    .iter()
                    .map(|e| &e.id)
                    .collect();
                Ok(pending
                    .iter()
                    .any(|t| t.edge().is_some_and(|e| incoming.contains(e))))
            }
            // entry nodes fire from their single seed or invocation token
            NodeKind::Initial | NodeKind::ActivityParameter { .. } => Ok(pending.len() == 1),
            NodeKind::Call { behavior } => {
                if !self.edges_saturated(graph, node, pending) {
                    return Ok(false);
                }
                self.call_inputs_satisfied(graph, node, pending, bound, catalog, behavior)
            }
            _ => Ok(self.edges_saturated(graph, node, pending)),
        }
    }

    /// Distinct pending-token edges must equal the full incoming edge
    /// set. Pin-hop tokens carry no edge and do not count here.
    fn edges_saturated(
        &self,
        graph: &ActivityGraph,
        node: &ActivityNode,
        pending: &[&EdgeFlow],
    ) -> bool {
        let incoming: HashSet<&EdgeId> = graph
            .incoming_edges(&node.id)
            .iter()
            .map(|e| &e.id)
            .collect();
        let have: HashSet<&EdgeId> = pending.iter().filter_map(|t| t.edge()).collect();
        have == incoming
    }

    /// Every required input of the called behavior must be deliverable:
    /// a value pin carrying a literal, a pin-hop token already pending,
    /// or a bound parameter value of the same name.
    fn call_inputs_satisfied(
        &self,
        graph: &ActivityGraph,
        node: &ActivityNode,
        pending: &[&EdgeFlow],
        bound: &[ParameterValue],
        catalog: &BehaviorCatalog,
        behavior: &protocol_types::BehaviorId,
    ) -> ExecutionResult<bool> {
        let callee = catalog.get(behavior)?;
        for parameter in callee.required_inputs() {
            let pin = graph.input_pin(&node.id, &parameter.name)?;
            let satisfied = match &pin.kind {
                NodeKind::ValuePin { value, .. } => value.is_some(),
                _ => {
                    pending.iter().any(|t| t.source_pin() == Some(&pin.id))
                        || bound.iter().any(|pv| pv.parameter == parameter.name)
                }
            };
            if !satisfied {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol_types::{
        ActivityEdge, Behavior, EdgeFlow, Literal, NodeId, Parameter, RecordId, TokenId,
    };

    fn edge_token(id: u64, edge: &str, target: &str) -> EdgeFlow {
        EdgeFlow::on_edge(
            TokenId(id),
            EdgeId::new(edge),
            NodeId::new(target),
            RecordId(0),
            Literal::Null,
        )
    }

    fn make_join_graph() -> ActivityGraph {
        let mut g = ActivityGraph::new("sync");
        g.add_node(ActivityNode::initial("a")).unwrap();
        g.add_node(ActivityNode::initial("b")).unwrap();
        g.add_node(ActivityNode::join("sync")).unwrap();
        g.add_edge(ActivityEdge::control("e1", "a", "sync")).unwrap();
        g.add_edge(ActivityEdge::control("e2", "b", "sync")).unwrap();
        g
    }

    #[test]
    fn test_saturation_requires_every_incoming_edge() {
        let g = make_join_graph();
        let checker = EnablementChecker::new();
        let catalog = BehaviorCatalog::new();
        let node = g.node(&NodeId::new("sync")).unwrap();

        let t1 = edge_token(0, "e1", "sync");
        assert!(!checker
            .enabled(&g, node, &[&t1], &[], &catalog)
            .unwrap());

        let t2 = edge_token(1, "e2", "sync");
        assert!(checker
            .enabled(&g, node, &[&t1, &t2], &[], &catalog)
            .unwrap());
    }

    #[test]
    fn test_duplicate_edge_tokens_do_not_saturate() {
        let g = make_join_graph();
        let checker = EnablementChecker::new();
        let catalog = BehaviorCatalog::new();
        let node = g.node(&NodeId::new("sync")).unwrap();

        // two tokens on the same edge still leave e2 uncovered
        let t1 = edge_token(0, "e1", "sync");
        let t2 = edge_token(1, "e1", "sync");
        assert!(!checker
            .enabled(&g, node, &[&t1, &t2], &[], &catalog)
            .unwrap());
    }

    #[test]
    fn test_final_fires_on_any_incoming_token() {
        let mut g = ActivityGraph::new("race");
        g.add_node(ActivityNode::initial("a")).unwrap();
        g.add_node(ActivityNode::initial("b")).unwrap();
        g.add_node(ActivityNode::final_node("done")).unwrap();
        g.add_edge(ActivityEdge::control("e1", "a", "done")).unwrap();
        g.add_edge(ActivityEdge::control("e2", "b", "done")).unwrap();

        let checker = EnablementChecker::new();
        let catalog = BehaviorCatalog::new();
        let node = g.node(&NodeId::new("done")).unwrap();

        let t = edge_token(0, "e2", "done");
        assert!(checker.enabled(&g, node, &[&t], &[], &catalog).unwrap());
    }

    #[test]
    fn test_initial_fires_on_single_seed() {
        let mut g = ActivityGraph::new("start");
        g.add_node(ActivityNode::initial("start")).unwrap();
        let checker = EnablementChecker::new();
        let catalog = BehaviorCatalog::new();
        let node = g.node(&NodeId::new("start")).unwrap();

        let seed = EdgeFlow::seed(TokenId(0), NodeId::new("start"));
        assert!(checker
            .enabled(&g, node, &[&seed], &[], &catalog)
            .unwrap());
        assert!(!checker.enabled(&g, node, &[], &[], &catalog).unwrap());
    }

    #[test]
    fn test_call_requires_required_input_pins() {
        let mut g = ActivityGraph::new("transfer");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::call("step", "Pipette")).unwrap();
        g.add_node(ActivityNode::input_pin("step.source", "step", "source"))
            .unwrap();
        g.add_edge(ActivityEdge::control("e1", "start", "step"))
            .unwrap();

        let mut catalog = BehaviorCatalog::new();
        catalog
            .register(
                Behavior::primitive("Pipette").with_parameter(Parameter::input("source", 0)),
            )
            .unwrap();

        let checker = EnablementChecker::new();
        let node = g.node(&NodeId::new("step")).unwrap();
        let control = edge_token(0, "e1", "step");

        // control edge covered but the required pin is dry
        assert!(!checker
            .enabled(&g, node, &[&control], &[], &catalog)
            .unwrap());

        // pin-hop token satisfies it
        let pin = EdgeFlow::on_pin(
            TokenId(1),
            NodeId::new("step.source"),
            NodeId::new("step"),
            RecordId(0),
            Literal::string("wellA1"),
        );
        assert!(checker
            .enabled(&g, node, &[&control, &pin], &[], &catalog)
            .unwrap());

        // a bound parameter value of the same name also satisfies it
        let bound = vec![ParameterValue::new("source", Literal::string("wellA1"))];
        assert!(checker
            .enabled(&g, node, &[&control], &bound, &catalog)
            .unwrap());
    }

    #[test]
    fn test_call_value_pin_must_carry_literal() {
        let mut g = ActivityGraph::new("transfer");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::call("step", "Pipette")).unwrap();
        g.add_node(ActivityNode::value_pin("step.volume", "step", "volume", 25))
            .unwrap();
        g.add_edge(ActivityEdge::control("e1", "start", "step"))
            .unwrap();

        let mut catalog = BehaviorCatalog::new();
        catalog
            .register(
                Behavior::primitive("Pipette").with_parameter(Parameter::input("volume", 0)),
            )
            .unwrap();

        let checker = EnablementChecker::new();
        let node = g.node(&NodeId::new("step")).unwrap();
        let control = edge_token(0, "e1", "step");
        assert!(checker
            .enabled(&g, node, &[&control], &[], &catalog)
            .unwrap());
    }
}
