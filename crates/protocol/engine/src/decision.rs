//! Guard evaluation for decision nodes.
//!
//! The value that drives routing comes from one of three places, tried
//! in this order: the result of the node's decision-input behavior
//! (delivered as a token from that call's output pin), the node's
//! designated decision-input flow edge, or the primary incoming object
//! flow itself. Outgoing guards are tried in edge declaration order;
//! the distinguished else edge is taken only when no literal guard
//! matches.

use protocol_types::{
    ActivityEdge, ActivityGraph, ActivityNode, BehaviorId, EdgeFlow, EdgeId, ExecutionError,
    ExecutionResult, Literal, NodeKind, ProtocolExecution,
};

#[derive(Debug, Default)]
pub struct DecisionEvaluator;

impl DecisionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Pick the outgoing edge for a decision firing.
    ///
    /// Returns the chosen edge and the value the routed token should
    /// carry (the primary token's value, not the guard value).
    pub fn evaluate(
        &self,
        graph: &ActivityGraph,
        node: &ActivityNode,
        inputs: &[EdgeFlow],
        ex: &ProtocolExecution,
    ) -> ExecutionResult<(EdgeId, Literal)> {
        let (decision_input, decision_input_flow) = match &node.kind {
            NodeKind::Decision {
                decision_input,
                decision_input_flow,
            } => (decision_input, decision_input_flow),
            _ => {
                return Err(ExecutionError::Structural(format!(
                    "node {} is not a decision",
                    node.id
                )))
            }
        };

        let flow_token = decision_input_flow
            .as_ref()
            .and_then(|eid| inputs.iter().find(|t| t.edge() == Some(eid)));
        let return_token = decision_input.as_ref().and_then(|behavior| {
            inputs
                .iter()
                .find(|t| self.is_decision_return(graph, ex, t, behavior))
        });
        let primary = inputs.iter().find(|t| {
            flow_token.map(|f| f.id) != Some(t.id) && return_token.map(|r| r.id) != Some(t.id)
        });

        let chosen = if decision_input.is_some() {
            return_token.map(|t| t.value.clone()).ok_or_else(|| {
                ExecutionError::Structural(format!(
                    "decision {} fired without its decision-input result",
                    node.id
                ))
            })?
        } else if let Some(token) = flow_token {
            token.value.clone()
        } else if let Some(token) = primary {
            let is_object = token
                .edge()
                .and_then(|eid| graph.edges.iter().find(|e| &e.id == eid))
                .is_some_and(ActivityEdge::is_object_flow);
            if !is_object {
                return Err(ExecutionError::Structural(format!(
                    "decision {} has only control flow and no decision input",
                    node.id
                )));
            }
            token.value.clone()
        } else {
            return Err(ExecutionError::Structural(format!(
                "decision {} fired with no incoming token",
                node.id
            )));
        };

        let outgoing = graph.outgoing_edges(&node.id);
        let matched = outgoing
            .iter()
            .find(|e| e.guard_literal() == Some(&chosen))
            .or_else(|| outgoing.iter().find(|e| e.is_else()))
            .ok_or_else(|| ExecutionError::UnsatisfiableGuard {
                node: node.id.clone(),
            })?;

        let carried = primary.map(|t| t.value.clone()).unwrap_or(Literal::Null);
        Ok((matched.id.clone(), carried))
    }

    /// A token is the decision-input result if it left an output pin of
    /// a call whose record invoked the decision-input behavior.
    fn is_decision_return(
        &self,
        graph: &ActivityGraph,
        ex: &ProtocolExecution,
        token: &EdgeFlow,
        behavior: &BehaviorId,
    ) -> bool {
        let Some(eid) = token.edge() else { return false };
        let Some(edge) = graph.edges.iter().find(|e| &e.id == eid) else {
            return false;
        };
        let Some(source) = graph.node(&edge.source) else {
            return false;
        };
        if !matches!(source.kind, NodeKind::OutputPin { .. }) {
            return false;
        }
        let Some(record_id) = token.source_record else {
            return false;
        };
        let Some(record) = ex.record(record_id) else {
            return false;
        };
        record
            .call
            .as_ref()
            .is_some_and(|call| &call.behavior == behavior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use protocol_types::{
        ActivityEdge, BehaviorExecution, ExecutionRecord, NodeId, RecordId, TokenId,
    };

    fn empty_ex() -> ProtocolExecution {
        ProtocolExecution::new(BehaviorId::new("proto"), Utc::now())
    }

    fn make_decision_graph() -> ActivityGraph {
        let mut g = ActivityGraph::new("route");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::decision("route")).unwrap();
        g.add_node(ActivityNode::call("pass", "Accept")).unwrap();
        g.add_node(ActivityNode::call("fail", "Reject")).unwrap();
        g.add_edge(ActivityEdge::object("e-in", "start", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-pass", "route", "pass").with_guard("ok"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-fail", "route", "fail").with_else_guard())
            .unwrap();
        g
    }

    fn object_token(id: u64, edge: &str, target: &str, value: Literal) -> EdgeFlow {
        EdgeFlow::on_edge(
            TokenId(id),
            EdgeId::new(edge),
            NodeId::new(target),
            RecordId(0),
            value,
        )
    }

    #[test]
    fn test_primary_object_flow_drives_routing() {
        let g = make_decision_graph();
        let node = g.node(&NodeId::new("route")).unwrap();
        let evaluator = DecisionEvaluator::new();

        let token = object_token(0, "e-in", "route", Literal::string("ok"));
        let (edge, carried) = evaluator
            .evaluate(&g, node, &[token], &empty_ex())
            .unwrap();
        assert_eq!(edge, EdgeId::new("e-pass"));
        assert_eq!(carried, Literal::string("ok"));
    }

    #[test]
    fn test_else_edge_taken_when_no_guard_matches() {
        let g = make_decision_graph();
        let node = g.node(&NodeId::new("route")).unwrap();
        let evaluator = DecisionEvaluator::new();

        let token = object_token(0, "e-in", "route", Literal::string("contaminated"));
        let (edge, _) = evaluator
            .evaluate(&g, node, &[token], &empty_ex())
            .unwrap();
        assert_eq!(edge, EdgeId::new("e-fail"));
    }

    #[test]
    fn test_unsatisfiable_guard_without_else() {
        let mut g = ActivityGraph::new("route");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::decision("route")).unwrap();
        g.add_node(ActivityNode::call("pass", "Accept")).unwrap();
        g.add_edge(ActivityEdge::object("e-in", "start", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-pass", "route", "pass").with_guard("ok"))
            .unwrap();

        let node = g.node(&NodeId::new("route")).unwrap();
        let token = object_token(0, "e-in", "route", Literal::string("nope"));
        let result = DecisionEvaluator::new().evaluate(&g, node, &[token], &empty_ex());
        assert!(matches!(
            result,
            Err(ExecutionError::UnsatisfiableGuard { .. })
        ));
    }

    #[test]
    fn test_decision_input_flow_preferred_over_primary() {
        let mut g = ActivityGraph::new("route");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::initial("probe")).unwrap();
        g.add_node(
            ActivityNode::decision("route").with_decision_input_flow(EdgeId::new("e-probe")),
        )
        .unwrap();
        g.add_node(ActivityNode::call("pass", "Accept")).unwrap();
        g.add_node(ActivityNode::call("fail", "Reject")).unwrap();
        g.add_edge(ActivityEdge::object("e-in", "start", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-probe", "probe", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-pass", "route", "pass").with_guard(true))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-fail", "route", "fail").with_else_guard())
            .unwrap();

        let node = g.node(&NodeId::new("route")).unwrap();
        let primary = object_token(0, "e-in", "route", Literal::string("sample"));
        let probe = object_token(1, "e-probe", "route", Literal::boolean(true));

        let (edge, carried) = DecisionEvaluator::new()
            .evaluate(&g, node, &[primary, probe], &empty_ex())
            .unwrap();
        // routed by the probe value, carrying the primary value
        assert_eq!(edge, EdgeId::new("e-pass"));
        assert_eq!(carried, Literal::string("sample"));
    }

    #[test]
    fn test_decision_input_behavior_result_drives_routing() {
        let mut g = ActivityGraph::new("route");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::call("classify", "Classify"))
            .unwrap();
        g.add_node(ActivityNode::output_pin("classify.verdict", "classify", "verdict"))
            .unwrap();
        g.add_node(ActivityNode::decision("route").with_decision_input("Classify"))
            .unwrap();
        g.add_node(ActivityNode::call("pass", "Accept")).unwrap();
        g.add_node(ActivityNode::call("fail", "Reject")).unwrap();
        g.add_edge(ActivityEdge::object("e-in", "start", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-verdict", "classify.verdict", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-pass", "route", "pass").with_guard("clean"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-fail", "route", "fail").with_else_guard())
            .unwrap();

        let mut ex = empty_ex();
        ex.push_record(
            ExecutionRecord::new(RecordId(7), NodeId::new("classify"), vec![]).with_call(
                BehaviorExecution::open(BehaviorId::new("Classify"), vec![], Utc::now()),
            ),
        );

        let node = g.node(&NodeId::new("route")).unwrap();
        let primary = object_token(0, "e-in", "route", Literal::string("sample"));
        let verdict = EdgeFlow::on_edge(
            TokenId(1),
            EdgeId::new("e-verdict"),
            NodeId::new("route"),
            RecordId(7),
            Literal::string("clean"),
        );

        let (edge, carried) = DecisionEvaluator::new()
            .evaluate(&g, node, &[primary, verdict], &ex)
            .unwrap();
        assert_eq!(edge, EdgeId::new("e-pass"));
        assert_eq!(carried, Literal::string("sample"));
    }

    #[test]
    fn test_control_flow_primary_without_decision_input_is_structural() {
        let mut g = ActivityGraph::new("route");
        g.add_node(ActivityNode::initial("start")).unwrap();
        g.add_node(ActivityNode::decision("route")).unwrap();
        g.add_node(ActivityNode::call("pass", "Accept")).unwrap();
        g.add_edge(ActivityEdge::control("e-in", "start", "route"))
            .unwrap();
        g.add_edge(ActivityEdge::object("e-pass", "route", "pass").with_guard("ok"))
            .unwrap();

        let node = g.node(&NodeId::new("route")).unwrap();
        let token = object_token(0, "e-in", "route", Literal::Null);
        let result = DecisionEvaluator::new().evaluate(&g, node, &[token], &empty_ex());
        assert!(matches!(result, Err(ExecutionError::Structural(_))));
    }
}
