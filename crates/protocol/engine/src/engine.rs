//! The execution engine: the token-passing interpreter loop.
//!
//! A run seeds the protocol's entry nodes, then repeats one step until
//! quiescence: scan the pending tokens in production order, fire the
//! target of the earliest token whose node is enabled. Sub-protocol
//! graphs join the same loop through call frames; retiring a frame
//! releases the caller's downstream tokens. A graph that goes quiet
//! with work undone is not an error; the trace simply reports that
//! the run did not complete normally.

use crate::catalog::BehaviorCatalog;
use crate::clock::{LogicalClock, TimeMode};
use crate::dispatcher::NodeDispatcher;
use crate::enablement::EnablementChecker;
use crate::executor::{NullPrimitiveExecutor, PrimitiveExecutor};
use crate::frames::Frame;
use crate::run::RunState;
use crate::specialization::Specialization;
use protocol_types::{
    BehaviorId, EdgeFlow, ExecutionError, ExecutionResult, Literal, NodeId, ParameterValue,
    ProtocolExecution, RecordId,
};
use std::collections::HashSet;

/// Executes protocols from a behavior catalog
pub struct ExecutionEngine {
    catalog: BehaviorCatalog,
    executor: Box<dyn PrimitiveExecutor>,
    specializations: Vec<Box<dyn Specialization>>,
    time_mode: TimeMode,
    enablement: EnablementChecker,
    dispatcher: NodeDispatcher,
}

impl ExecutionEngine {
    /// Engine over a catalog, with the null executor and wall-clock time
    pub fn new(catalog: BehaviorCatalog) -> Self {
        Self {
            catalog,
            executor: Box::new(NullPrimitiveExecutor),
            specializations: Vec::new(),
            time_mode: TimeMode::default(),
            enablement: EnablementChecker::new(),
            dispatcher: NodeDispatcher::new(),
        }
    }

    /// Replace the primitive executor
    pub fn with_executor(mut self, executor: Box<dyn PrimitiveExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Attach a specialization hook
    pub fn with_specialization(mut self, specialization: Box<dyn Specialization>) -> Self {
        self.specializations.push(specialization);
        self
    }

    /// Select how the run's timestamps advance
    pub fn with_time_mode(mut self, mode: TimeMode) -> Self {
        self.time_mode = mode;
        self
    }

    pub fn catalog(&self) -> &BehaviorCatalog {
        &self.catalog
    }

    /// Execute a protocol to quiescence and return its trace.
    ///
    /// Structural and missing-parameter errors abort the run. A graph
    /// that simply stops making progress returns a trace whose
    /// `completed_normally` flag is false.
    pub fn execute(
        &mut self,
        protocol: &BehaviorId,
        parameter_values: Vec<ParameterValue>,
    ) -> ExecutionResult<ProtocolExecution> {
        let behavior = self.catalog.get(protocol)?;
        let graph = behavior.graph().ok_or_else(|| {
            ExecutionError::Structural(format!("behavior {protocol} is not graph-backed"))
        })?;
        graph.validate()?;
        let required_outputs: Vec<String> = behavior
            .required_outputs()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let entry_nodes: Vec<NodeId> = graph
            .initiating_nodes()
            .iter()
            .map(|n| n.id.clone())
            .collect();

        let clock = LogicalClock::start(self.time_mode.clone());
        let mut ex = ProtocolExecution::new(protocol.clone(), clock.start_time());
        for value in parameter_values {
            ex.bind_parameter(value);
        }
        let mut state = RunState::new(ex, clock);
        state.register_graph(protocol, graph)?;

        tracing::info!(
            protocol = %protocol,
            execution = %state.ex.id,
            "starting protocol execution"
        );
        for specialization in &mut self.specializations {
            specialization.on_begin(&state.ex);
        }
        for node in entry_nodes {
            let tid = state.next_token_id();
            state.emit(EdgeFlow::seed(tid, node));
        }

        while let Some(node_id) = self.next_ready(&state)? {
            let record_id =
                self.dispatcher
                    .fire(&mut state, &node_id, &self.catalog, self.executor.as_mut())?;
            self.notify(&state, record_id);
            self.retire_frames(&mut state)?;
        }

        state.ex.end_time = Some(state.clock.now());
        state.ex.completed_normally = required_outputs
            .iter()
            .all(|name| state.ex.parameter(name).is_some());
        for specialization in &mut self.specializations {
            specialization.on_end(&state.ex);
        }
        tracing::info!(
            execution = %state.ex.id,
            records = state.ex.record_count(),
            completed_normally = state.ex.completed_normally,
            "protocol execution finished"
        );
        Ok(state.ex)
    }

    /// The target of the earliest pending token whose node is enabled
    fn next_ready(&self, state: &RunState) -> ExecutionResult<Option<NodeId>> {
        let mut checked: HashSet<&NodeId> = HashSet::new();
        for token in &state.pending {
            if !checked.insert(&token.target) {
                continue;
            }
            let pending_for: Vec<&EdgeFlow> = state
                .pending
                .iter()
                .filter(|t| t.target == token.target)
                .collect();
            let owner = state.owner_of(&token.target)?;
            let graph = self.catalog.get(owner)?.graph().ok_or_else(|| {
                ExecutionError::Structural(format!("behavior {owner} is not graph-backed"))
            })?;
            let node = graph.require_node(&token.target)?;
            if self.enablement.enabled(
                graph,
                node,
                &pending_for,
                &state.ex.parameter_values,
                &self.catalog,
            )? {
                return Ok(Some(token.target.clone()));
            }
        }
        Ok(None)
    }

    /// Hand the newest record to every specialization. Hook failures
    /// are logged and recovered; they never abort the run.
    fn notify(&mut self, state: &RunState, record_id: RecordId) {
        let Some(record) = state.ex.record(record_id) else {
            return;
        };
        for specialization in &mut self.specializations {
            if let Err(error) = specialization.process(record, &state.ex) {
                tracing::error!(
                    record = %record.id,
                    node = %record.node,
                    %error,
                    "specialization failed; continuing"
                );
            }
        }
    }

    /// Retire every innermost frame whose sub-protocol is done
    fn retire_frames(&self, state: &mut RunState) -> ExecutionResult<()> {
        loop {
            match state.stack.innermost() {
                Some(frame) if frame.retirable() => {}
                _ => return Ok(()),
            }
            let Some(frame) = state.stack.pop() else {
                return Ok(());
            };
            self.retire(state, frame)?;
        }
    }

    /// Close a frame's call record and release the caller's downstream
    /// tokens, carrying the sub-protocol's outputs out through the
    /// call's output pins.
    fn retire(&self, state: &mut RunState, frame: Frame) -> ExecutionResult<()> {
        let caller_owner = state.owner_of(&frame.call_node)?.clone();
        let graph = self.catalog.get(&caller_owner)?.graph().ok_or_else(|| {
            ExecutionError::Structural(format!("behavior {caller_owner} is not graph-backed"))
        })?;
        state.end_invocation(&frame.behavior, frame.record);

        let end = state.clock.now();
        let outputs = frame.outputs().to_vec();
        if let Some(record) = state.ex.record_mut(frame.record) {
            if let Some(call) = record.call.as_mut() {
                call.parameter_values.extend(outputs.iter().cloned());
                call.complete(end, true);
            }
        }
        tracing::debug!(
            call = %frame.call_node,
            behavior = %frame.behavior,
            outputs = outputs.len(),
            "sub-protocol retired"
        );

        let mut connected: HashSet<NodeId> = HashSet::new();
        for edge in graph.call_outgoing_edges(&frame.call_node) {
            let value = if edge.is_object_flow() {
                connected.insert(edge.source.clone());
                graph
                    .node(&edge.source)
                    .and_then(|pin| pin.pin_name())
                    .and_then(|name| outputs.iter().find(|pv| pv.parameter == name))
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
                frame.record,
                value,
            ));
        }

        let parent = state.current_invocation(&caller_owner);
        for pin in graph.output_pins(&frame.call_node) {
            if connected.contains(&pin.id) {
                continue;
            }
            let Some(name) = pin.pin_name() else { continue };
            if let Some(pv) = outputs.iter().find(|pv| pv.parameter == name) {
                match parent.and_then(|record| state.stack.frame_mut(record)) {
                    Some(parent) => parent.bind_output(pv.clone()),
                    None => state.ex.bind_parameter(pv.clone()),
                }
            }
        }

        Ok(())
    }
}
