//! Mutable state of one run: the trace under construction, the pending
//! token pool, the clock, the frame stack, and the sequence counters
//! behind token and record identities.

use crate::clock::LogicalClock;
use crate::frames::CallStack;
use protocol_types::{
    ActivityGraph, BehaviorId, EdgeFlow, EdgeId, ExecutionError, ExecutionResult, NodeId,
    ProtocolExecution, RecordId, TokenId,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

pub(crate) struct RunState {
    /// The trace being built, returned to the caller at run's end
    pub ex: ProtocolExecution,
    pub clock: LogicalClock,
    pub stack: CallStack,
    /// Unconsumed tokens, in production order
    pub pending: Vec<EdgeFlow>,
    /// Which behavior's graph owns each active node
    node_owner: HashMap<NodeId, BehaviorId>,
    /// Open invocation records per graph-backed behavior, innermost last
    open_calls: HashMap<BehaviorId, Vec<RecordId>>,
    token_seq: u64,
    record_seq: u64,
    call_edge_seq: u64,
}

impl RunState {
    pub fn new(ex: ProtocolExecution, clock: LogicalClock) -> Self {
        Self {
            ex,
            clock,
            stack: CallStack::new(),
            pending: Vec::new(),
            node_owner: HashMap::new(),
            open_calls: HashMap::new(),
            token_seq: 0,
            record_seq: 0,
            call_edge_seq: 0,
        }
    }

    pub fn next_token_id(&mut self) -> TokenId {
        let id = TokenId(self.token_seq);
        self.token_seq += 1;
        id
    }

    pub fn next_record_id(&mut self) -> RecordId {
        let id = RecordId(self.record_seq);
        self.record_seq += 1;
        id
    }

    pub fn next_call_edge_id(&mut self) -> EdgeId {
        let id = EdgeId::new(format!("call-edge-{}", self.call_edge_seq));
        self.call_edge_seq += 1;
        id
    }

    /// Register a graph's nodes as active under the owning behavior.
    ///
    /// Node IDs must be unique across every graph active in a run so
    /// that a token's target resolves to one node. Registering a graph
    /// again under its existing owner is a no-op, so a behavior may be
    /// invoked any number of times in one run.
    pub fn register_graph(
        &mut self,
        owner: &BehaviorId,
        graph: &ActivityGraph,
    ) -> ExecutionResult<()> {
        for node in &graph.nodes {
            match self.node_owner.entry(node.id.clone()) {
                Entry::Occupied(existing) if existing.get() != owner => {
                    return Err(ExecutionError::Structural(format!(
                        "node {} appears in graphs of both {} and {}",
                        node.id,
                        existing.get(),
                        owner
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(owner.clone());
                }
            }
        }
        Ok(())
    }

    /// Note that a call record opened an invocation of a behavior
    pub fn begin_invocation(&mut self, behavior: &BehaviorId, record: RecordId) {
        self.open_calls
            .entry(behavior.clone())
            .or_default()
            .push(record);
    }

    /// Note that an invocation retired
    pub fn end_invocation(&mut self, behavior: &BehaviorId, record: RecordId) {
        if let Some(records) = self.open_calls.get_mut(behavior) {
            records.retain(|r| *r != record);
            if records.is_empty() {
                self.open_calls.remove(behavior);
            }
        }
    }

    /// The record of the innermost open invocation of a behavior
    pub fn current_invocation(&self, behavior: &BehaviorId) -> Option<RecordId> {
        self.open_calls
            .get(behavior)
            .and_then(|records| records.last())
            .copied()
    }

    /// The behavior whose graph owns a node
    pub fn owner_of(&self, node: &NodeId) -> ExecutionResult<&BehaviorId> {
        self.node_owner
            .get(node)
            .ok_or_else(|| ExecutionError::NodeNotFound(node.clone()))
    }

    /// Produce a token: appended to the trace pool and to the pending
    /// pool in one step
    pub fn emit(&mut self, flow: EdgeFlow) {
        self.ex.push_flows([flow.clone()]);
        self.pending.push(flow);
    }

    /// Consume all pending tokens targeting a node, preserving order
    /// among the rest
    pub fn take_pending_for(&mut self, node: &NodeId) -> Vec<EdgeFlow> {
        let mut taken = Vec::new();
        let mut rest = Vec::new();
        for token in self.pending.drain(..) {
            if &token.target == node {
                taken.push(token);
            } else {
                rest.push(token);
            }
        }
        self.pending = rest;
        taken
    }
}
