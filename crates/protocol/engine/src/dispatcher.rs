//! Node firing: consume tokens, record the firing, produce tokens.
//!
//! One exhaustive match over the node kind. Firing appends exactly one
//! record to the trace; what else happens depends on the kind:
//! primitives are handed to the executor, sub-protocols open a frame
//! and seed their graph, decisions route, parameter nodes bind.

use crate::catalog::BehaviorCatalog;
use crate::decision::DecisionEvaluator;
use crate::executor::PrimitiveExecutor;
use crate::frames::Frame;
use crate::run::RunState;
use protocol_types::{
    ActivityEdge, ActivityGraph, Behavior, BehaviorExecution, BehaviorId, EdgeFlow, EdgeKind,
    ExecutionError, ExecutionRecord, ExecutionResult, Implementation, Literal, NodeId, NodeKind,
    ParameterDirection, ParameterValue, RecordId, TokenId,
};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct NodeDispatcher {
    decisions: DecisionEvaluator,
}

impl NodeDispatcher {
    pub fn new() -> Self {
        Self {
            decisions: DecisionEvaluator::new(),
        }
    }

    /// Fire one enabled node: consume its pending tokens, append its
    /// record, and produce downstream tokens.
    pub(crate) fn fire(
        &self,
        state: &mut RunState,
        node_id: &NodeId,
        catalog: &BehaviorCatalog,
        executor: &mut dyn PrimitiveExecutor,
    ) -> ExecutionResult<RecordId> {
        let owner = state.owner_of(node_id)?.clone();
        let behavior = catalog.get(&owner)?;
        let graph = behavior.graph().ok_or_else(|| {
            ExecutionError::Structural(format!("behavior {owner} is not graph-backed"))
        })?;
        let node = graph.require_node(node_id)?;

        let inputs = state.take_pending_for(node_id);
        let input_ids: Vec<TokenId> = inputs.iter().map(|t| t.id).collect();
        let record_id = state.next_record_id();
        tracing::debug!(
            node = %node_id,
            kind = node.kind_name(),
            tokens = inputs.len(),
            "firing node"
        );

        match &node.kind {
            NodeKind::Initial => {
                // only a seed or an invocation edge may feed an initial node
                let stray = inputs
                    .iter()
                    .filter(|t| t.edge().is_some_and(|e| state.ex.call_edge(e).is_none()))
                    .count();
                if stray > 0 {
                    return Err(ExecutionError::WrongInputArity {
                        node: node_id.clone(),
                        expected: 0,
                        actual: stray,
                    });
                }
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
                self.emit_control(state, graph, node_id, record_id);
            }

            NodeKind::FlowFinal | NodeKind::Final => {
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
                self.emit_control(state, graph, node_id, record_id);
                if let Some(invocation) = state.current_invocation(&owner) {
                    state.stack.mark_terminal(invocation);
                }
            }

            NodeKind::Fork => {
                if inputs.len() != 1 {
                    return Err(ExecutionError::WrongInputArity {
                        node: node_id.clone(),
                        expected: 1,
                        actual: inputs.len(),
                    });
                }
                let value = inputs[0].value.clone();
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
                for edge in graph.outgoing_edges(node_id) {
                    let tid = state.next_token_id();
                    state.emit(EdgeFlow::on_edge(
                        tid,
                        edge.id.clone(),
                        edge.target.clone(),
                        record_id,
                        value.clone(),
                    ));
                }
            }

            NodeKind::Join | NodeKind::Merge => {
                return Err(ExecutionError::UnsupportedNode {
                    node: node_id.clone(),
                    kind: node.kind_name(),
                });
            }

            NodeKind::Decision { .. } => {
                let (edge_id, value) = self.decisions.evaluate(graph, node, &inputs, &state.ex)?;
                let target = graph
                    .edges
                    .iter()
                    .find(|e| e.id == edge_id)
                    .map(|e| e.target.clone())
                    .ok_or_else(|| ExecutionError::EdgeEndpointNotFound {
                        edge: edge_id.clone(),
                        node: node_id.clone(),
                    })?;
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
                let tid = state.next_token_id();
                state.emit(EdgeFlow::on_edge(tid, edge_id, target, record_id, value));
            }

            NodeKind::ActivityParameter {
                parameter,
                direction: ParameterDirection::In,
            } => {
                if inputs.len() != 1 {
                    return Err(ExecutionError::WrongInputArity {
                        node: node_id.clone(),
                        expected: 1,
                        actual: inputs.len(),
                    });
                }
                let value = if inputs[0].is_seed() {
                    self.resolve_input_parameter(state, behavior, node_id, parameter)?
                } else {
                    inputs[0].value.clone()
                };
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
                for edge in graph.outgoing_edges(node_id) {
                    let tid = state.next_token_id();
                    state.emit(EdgeFlow::on_edge(
                        tid,
                        edge.id.clone(),
                        edge.target.clone(),
                        record_id,
                        value.clone(),
                    ));
                }
            }

            NodeKind::ActivityParameter {
                parameter,
                direction: ParameterDirection::Out,
            } => {
                if inputs.len() != 1 {
                    return Err(ExecutionError::WrongInputArity {
                        node: node_id.clone(),
                        expected: 1,
                        actual: inputs.len(),
                    });
                }
                let bound = ParameterValue::new(parameter.clone(), inputs[0].value.clone());
                tracing::debug!(node = %node_id, value = %bound, "output parameter bound");
                let invocation = state.current_invocation(&owner);
                match invocation.and_then(|record| state.stack.frame_mut(record)) {
                    Some(frame) => frame.bind_output(bound),
                    None => state.ex.bind_parameter(bound),
                }
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
            }

            NodeKind::InputPin { owner: call, .. }
            | NodeKind::OutputPin { owner: call, .. }
            | NodeKind::ValuePin { owner: call, .. } => {
                if inputs.len() != 1 {
                    return Err(ExecutionError::WrongInputArity {
                        node: node_id.clone(),
                        expected: 1,
                        actual: inputs.len(),
                    });
                }
                let call = call.clone();
                let value = inputs[0].value.clone();
                state
                    .ex
                    .push_record(ExecutionRecord::new(record_id, node_id.clone(), input_ids));
                let tid = state.next_token_id();
                state.emit(EdgeFlow::on_pin(tid, node_id.clone(), call, record_id, value));
            }

            NodeKind::Call { behavior: callee } => {
                let callee = callee.clone();
                self.fire_call(
                    state, graph, &owner, node_id, &callee, inputs, record_id, input_ids, catalog,
                    executor,
                )?;
            }
        }

        Ok(record_id)
    }

    /// Control tokens on every outgoing edge
    fn emit_control(
        &self,
        state: &mut RunState,
        graph: &ActivityGraph,
        node_id: &NodeId,
        record_id: RecordId,
    ) {
        for edge in graph.outgoing_edges(node_id) {
            let tid = state.next_token_id();
            state.emit(EdgeFlow::on_edge(
                tid,
                edge.id.clone(),
                edge.target.clone(),
                record_id,
                Literal::Null,
            ));
        }
    }

    /// Value for a seeded input parameter node. At the top level a
    /// binding supplied at run start wins; inside an open invocation
    /// only the declared default applies, so a sub-protocol input never
    /// inherits an outer binding that happens to share its name.
    fn resolve_input_parameter(
        &self,
        state: &RunState,
        behavior: &Behavior,
        node_id: &NodeId,
        parameter: &str,
    ) -> ExecutionResult<Literal> {
        if state.current_invocation(&behavior.id).is_none() {
            if let Some(bound) = state.ex.parameter(parameter) {
                return Ok(bound.value.clone());
            }
        }
        behavior
            .parameter(parameter, ParameterDirection::In)
            .and_then(|p| p.default.clone())
            .ok_or_else(|| ExecutionError::MissingParameter {
                node: node_id.clone(),
                parameter: parameter.to_string(),
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_call(
        &self,
        state: &mut RunState,
        graph: &ActivityGraph,
        owner: &BehaviorId,
        node_id: &NodeId,
        callee_id: &BehaviorId,
        inputs: Vec<EdgeFlow>,
        record_id: RecordId,
        input_ids: Vec<TokenId>,
        catalog: &BehaviorCatalog,
        executor: &mut dyn PrimitiveExecutor,
    ) -> ExecutionResult<()> {
        let callee = catalog.get(callee_id)?;
        let values = self.gather_call_inputs(graph, node_id, callee, &inputs)?;
        tracing::info!(
            node = %node_id,
            behavior = %callee_id,
            inputs = values.len(),
            "invoking behavior"
        );

        match &callee.implementation {
            Implementation::Primitive => self.fire_primitive(
                state, graph, owner, node_id, callee, values, record_id, input_ids, executor,
            ),
            Implementation::Graph(sub) => self.open_subprotocol(
                state, graph, node_id, callee, sub, values, inputs, record_id, input_ids,
            ),
        }
    }

    /// Resolve the call's input parameter values from its pins, ordered
    /// by parameter declaration index.
    fn gather_call_inputs(
        &self,
        graph: &ActivityGraph,
        node_id: &NodeId,
        callee: &Behavior,
        inputs: &[EdgeFlow],
    ) -> ExecutionResult<Vec<ParameterValue>> {
        let mut supplied: Vec<(u32, ParameterValue)> = Vec::new();
        for token in inputs {
            if let Some(pin_id) = token.source_pin() {
                let pin = graph.require_node(pin_id)?;
                let name = pin.pin_name().ok_or_else(|| {
                    ExecutionError::Structural(format!("token source {pin_id} is not a pin"))
                })?;
                let parameter = callee.pin_parameter(name)?;
                supplied.push((
                    parameter.index,
                    ParameterValue::new(name, token.value.clone()),
                ));
            }
        }
        for pin in graph.input_pins(node_id) {
            if let NodeKind::ValuePin {
                pin: name,
                value: Some(value),
                ..
            } = &pin.kind
            {
                let parameter = callee.pin_parameter(name)?;
                supplied.push((parameter.index, ParameterValue::new(name.clone(), value.clone())));
            }
        }
        supplied.sort_by_key(|(index, _)| *index);
        Ok(supplied.into_iter().map(|(_, pv)| pv).collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_primitive(
        &self,
        state: &mut RunState,
        graph: &ActivityGraph,
        owner: &BehaviorId,
        node_id: &NodeId,
        callee: &Behavior,
        values: Vec<ParameterValue>,
        record_id: RecordId,
        input_ids: Vec<TokenId>,
        executor: &mut dyn PrimitiveExecutor,
    ) -> ExecutionResult<()> {
        let outcome = executor.invoke(callee, &values, &mut state.clock)?;

        let mut call = BehaviorExecution::open(callee.id.clone(), values, outcome.start_time);
        call.parameter_values.extend(outcome.outputs.iter().cloned());
        call.complete(outcome.end_time, outcome.completed_normally);
        state.ex.push_record(
            ExecutionRecord::new(record_id, node_id.clone(), input_ids).with_call(call),
        );

        let mut connected: HashSet<NodeId> = HashSet::new();
        for edge in graph.call_outgoing_edges(node_id) {
            let value = if edge.is_object_flow() {
                connected.insert(edge.source.clone());
                graph
                    .node(&edge.source)
                    .and_then(|pin| pin.pin_name())
                    .and_then(|name| outcome.outputs.iter().find(|pv| pv.parameter == name))
                    .map(|pv| pv.value.clone())
                    .unwrap_or(Literal::Null)
            } else {
                Literal::Null
            };
            let tid = state.next_token_id();
            state.emit(EdgeFlow::on_edge(
                tid,
                edge.id.clone(),
                edge.target.clone(),
                record_id,
                value,
            ));
        }

        // outputs with no outgoing wire surface as bindings in the
        // enclosing scope
        let invocation = state.current_invocation(owner);
        for pin in graph.output_pins(node_id) {
            if connected.contains(&pin.id) {
                continue;
            }
            let Some(name) = pin.pin_name() else { continue };
            if let Some(pv) = outcome.outputs.iter().find(|pv| pv.parameter == name) {
                match invocation.and_then(|record| state.stack.frame_mut(record)) {
                    Some(frame) => frame.bind_output(pv.clone()),
                    None => state.ex.bind_parameter(pv.clone()),
                }
            }
        }

        Ok(())
    }

    /// Open a frame for a graph-backed behavior and seed its graph
    /// with invocation tokens.
    #[allow(clippy::too_many_arguments)]
    fn open_subprotocol(
        &self,
        state: &mut RunState,
        graph: &ActivityGraph,
        node_id: &NodeId,
        callee: &Behavior,
        sub: &ActivityGraph,
        values: Vec<ParameterValue>,
        inputs: Vec<EdgeFlow>,
        record_id: RecordId,
        input_ids: Vec<TokenId>,
    ) -> ExecutionResult<()> {
        sub.validate()?;
        state.register_graph(&callee.id, sub)?;

        let start = state.clock.now();
        let call = BehaviorExecution::open(callee.id.clone(), values.clone(), start);
        state.ex.push_record(
            ExecutionRecord::new(record_id, node_id.clone(), input_ids).with_call(call),
        );
        state.begin_invocation(&callee.id, record_id);

        let required = callee
            .required_outputs()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        state.stack.push(Frame::new(
            record_id,
            node_id.clone(),
            callee.id.clone(),
            required,
        ));

        // value of the caller's incoming control token, if any, carried
        // over to the sub-graph's initial node
        let control_value = inputs.iter().find_map(|t| {
            let eid = t.edge()?;
            let kind = graph
                .edges
                .iter()
                .find(|e| &e.id == eid)
                .map(|e| e.kind)
                .or_else(|| state.ex.call_edge(eid).map(|e| e.kind))?;
            (kind == EdgeKind::ControlFlow).then(|| t.value.clone())
        });

        for init in sub.initiating_nodes() {
            match &init.kind {
                NodeKind::Initial => {
                    let edge_id = state.next_call_edge_id();
                    state.ex.push_call_edge(ActivityEdge {
                        id: edge_id.clone(),
                        kind: EdgeKind::ControlFlow,
                        source: node_id.clone(),
                        target: init.id.clone(),
                        guard: None,
                    });
                    let tid = state.next_token_id();
                    state.emit(EdgeFlow::on_edge(
                        tid,
                        edge_id,
                        init.id.clone(),
                        record_id,
                        control_value.clone().unwrap_or(Literal::Null),
                    ));
                }
                NodeKind::ActivityParameter { parameter, .. } => {
                    // input pins and value pins both land in the gathered
                    // call inputs; match the sub-graph's parameter by name
                    let supplied = values
                        .iter()
                        .find(|pv| &pv.parameter == parameter)
                        .map(|pv| pv.value.clone());
                    match supplied {
                        Some(value) => {
                            let source = graph
                                .input_pins(node_id)
                                .into_iter()
                                .find(|pin| pin.pin_name() == Some(parameter.as_str()))
                                .map(|pin| pin.id.clone())
                                .unwrap_or_else(|| node_id.clone());
                            let edge_id = state.next_call_edge_id();
                            state.ex.push_call_edge(ActivityEdge {
                                id: edge_id.clone(),
                                kind: EdgeKind::ObjectFlow,
                                source,
                                target: init.id.clone(),
                                guard: None,
                            });
                            let tid = state.next_token_id();
                            state.emit(EdgeFlow::on_edge(
                                tid,
                                edge_id,
                                init.id.clone(),
                                record_id,
                                value,
                            ));
                        }
                        None => {
                            // unwired parameter: seed only when a declared
                            // default can resolve it at firing time
                            let defaulted = callee
                                .parameter(parameter, ParameterDirection::In)
                                .is_some_and(|p| p.default.is_some());
                            if defaulted {
                                let tid = state.next_token_id();
                                state.emit(EdgeFlow::seed(tid, init.id.clone()));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}
