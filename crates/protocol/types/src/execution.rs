//! Execution records: the append-only trace of one protocol run.
//!
//! Records, tokens, and bound parameter values are only ever appended
//! during a run; nothing is mutated or deleted once written, so the
//! trace can be replayed for debugging or rendered downstream.

use crate::{ActivityEdge, BehaviorId, EdgeFlow, NodeId, ParameterValue, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a protocol execution
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one node firing, sequential within a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

// ── Behavior execution ───────────────────────────────────────────────

/// One behavior invocation: a primitive call or a sub-protocol run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorExecution {
    /// The behavior invoked
    pub behavior: BehaviorId,
    /// Resolved parameter values, in declaration order; outputs are
    /// appended as they are produced
    pub parameter_values: Vec<ParameterValue>,
    /// When the invocation started
    pub start_time: DateTime<Utc>,
    /// When the invocation ended (None while a sub-protocol is open)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Whether the invocation completed normally
    pub completed_normally: bool,
}

impl BehaviorExecution {
    /// An invocation that is still open (sub-protocol in flight)
    pub fn open(
        behavior: BehaviorId,
        parameter_values: Vec<ParameterValue>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            behavior,
            parameter_values,
            start_time,
            end_time: None,
            completed_normally: false,
        }
    }

    /// Close the invocation
    pub fn complete(&mut self, end_time: DateTime<Utc>, completed_normally: bool) {
        self.end_time = Some(end_time);
        self.completed_normally = completed_normally;
    }

    /// Look up a produced output by parameter name
    pub fn output(&self, parameter: &str) -> Option<&ParameterValue> {
        self.parameter_values
            .iter()
            .find(|pv| pv.parameter == parameter)
    }
}

// ── Execution record ─────────────────────────────────────────────────

/// One node firing: the node, the tokens it consumed, and (for calls)
/// the nested behavior invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Sequential identifier
    pub id: RecordId,
    /// The node that fired
    pub node: NodeId,
    /// Tokens consumed by this firing
    pub incoming_flows: Vec<TokenId>,
    /// The behavior invocation, for call nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<BehaviorExecution>,
}

impl ExecutionRecord {
    pub fn new(id: RecordId, node: NodeId, incoming_flows: Vec<TokenId>) -> Self {
        Self {
            id,
            node,
            incoming_flows,
            call: None,
        }
    }

    pub fn with_call(mut self, call: BehaviorExecution) -> Self {
        self.call = Some(call);
        self
    }

    /// Check if this record is a call firing
    pub fn is_call(&self) -> bool {
        self.call.is_some()
    }
}

// ── Protocol execution ───────────────────────────────────────────────

/// The aggregate trace of one protocol run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolExecution {
    /// Unique identifier for this run
    pub id: ExecutionId,
    /// The protocol that was executed
    pub protocol: BehaviorId,
    /// Ordered node firings
    pub executions: Vec<ExecutionRecord>,
    /// Every token ever produced, including consumed ones
    pub flows: Vec<EdgeFlow>,
    /// Bound parameter values: caller-supplied inputs plus outputs
    /// bound as they are produced
    pub parameter_values: Vec<ParameterValue>,
    /// Invocation edges synthesized for sub-protocol calls
    pub call_edges: Vec<ActivityEdge>,
    /// When the run started
    pub start_time: DateTime<Utc>,
    /// When the run ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// True iff every required output parameter of the protocol was
    /// bound by run's end
    pub completed_normally: bool,
}

impl ProtocolExecution {
    /// Create an empty trace for a run starting now
    pub fn new(protocol: BehaviorId, start_time: DateTime<Utc>) -> Self {
        Self {
            id: ExecutionId::generate(),
            protocol,
            executions: Vec::new(),
            flows: Vec::new(),
            parameter_values: Vec::new(),
            call_edges: Vec::new(),
            start_time,
            end_time: None,
            completed_normally: false,
        }
    }

    // ── Append-only mutators ─────────────────────────────────────────

    /// Append a node firing
    pub fn push_record(&mut self, record: ExecutionRecord) {
        self.executions.push(record);
    }

    /// Append produced tokens to the pool
    pub fn push_flows(&mut self, flows: impl IntoIterator<Item = EdgeFlow>) {
        self.flows.extend(flows);
    }

    /// Bind a parameter value
    pub fn bind_parameter(&mut self, value: ParameterValue) {
        self.parameter_values.push(value);
    }

    /// Register a synthesized invocation edge
    pub fn push_call_edge(&mut self, edge: ActivityEdge) {
        self.call_edges.push(edge);
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Get a record by ID
    pub fn record(&self, id: RecordId) -> Option<&ExecutionRecord> {
        self.executions.iter().find(|r| r.id == id)
    }

    /// Get a mutable record by ID (used to close an open call)
    pub fn record_mut(&mut self, id: RecordId) -> Option<&mut ExecutionRecord> {
        self.executions.iter_mut().find(|r| r.id == id)
    }

    /// All firings of a given node, in order
    pub fn records_for_node(&self, node: &NodeId) -> Vec<&ExecutionRecord> {
        self.executions.iter().filter(|r| &r.node == node).collect()
    }

    /// All call firings, in order
    pub fn call_records(&self) -> Vec<&ExecutionRecord> {
        self.executions.iter().filter(|r| r.is_call()).collect()
    }

    /// Get a token by ID
    pub fn token(&self, id: TokenId) -> Option<&EdgeFlow> {
        self.flows.iter().find(|t| t.id == id)
    }

    /// A synthesized invocation edge by ID, if one was registered
    pub fn call_edge(&self, id: &crate::EdgeId) -> Option<&ActivityEdge> {
        self.call_edges.iter().find(|e| &e.id == id)
    }

    /// The first bound value for a parameter name
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameter_values.iter().find(|pv| pv.parameter == name)
    }

    /// Number of node firings
    pub fn record_count(&self) -> usize {
        self.executions.len()
    }

    /// Number of tokens ever produced
    pub fn token_count(&self) -> usize {
        self.flows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;

    #[test]
    fn test_record_ordering() {
        let mut ex = ProtocolExecution::new(BehaviorId::new("proto"), Utc::now());
        ex.push_record(ExecutionRecord::new(RecordId(0), NodeId::new("a"), vec![]));
        ex.push_record(ExecutionRecord::new(RecordId(1), NodeId::new("b"), vec![]));

        assert_eq!(ex.record_count(), 2);
        assert_eq!(ex.executions[0].node, NodeId::new("a"));
        assert!(ex.record(RecordId(1)).is_some());
    }

    #[test]
    fn test_behavior_execution_lifecycle() {
        let mut call = BehaviorExecution::open(
            BehaviorId::new("Sub"),
            vec![ParameterValue::new("x", Literal::integer(1))],
            Utc::now(),
        );
        assert!(!call.completed_normally);
        assert!(call.end_time.is_none());

        call.parameter_values
            .push(ParameterValue::new("result", Literal::string("ok")));
        call.complete(Utc::now(), true);

        assert!(call.completed_normally);
        assert_eq!(call.output("result").unwrap().value, Literal::string("ok"));
    }

    #[test]
    fn test_parameter_binding() {
        let mut ex = ProtocolExecution::new(BehaviorId::new("proto"), Utc::now());
        ex.bind_parameter(ParameterValue::new("samples", Literal::integer(8)));
        assert_eq!(
            ex.parameter("samples").unwrap().value,
            Literal::integer(8)
        );
        assert!(ex.parameter("missing").is_none());
    }

    #[test]
    fn test_serializes() {
        let ex = ProtocolExecution::new(BehaviorId::new("proto"), Utc::now());
        let json = serde_json::to_string(&ex).unwrap();
        let back: ProtocolExecution = serde_json::from_str(&json).unwrap();
        assert_eq!(back.protocol, BehaviorId::new("proto"));
    }
}
