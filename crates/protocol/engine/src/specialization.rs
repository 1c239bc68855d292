//! Specialization hooks: downstream consumers of the trace.
//!
//! A specialization observes every node firing as it happens:
//! rendering human-readable run sheets, exporting to an external
//! format, accumulating provenance. Specializations are observers
//! only: a failing hook is logged and recovered, and never aborts
//! the run.

use protocol_types::{ExecutionRecord, ExecutionResult, ProtocolExecution};

/// Observes a run as it unfolds
pub trait Specialization {
    /// Called once before the first node fires
    fn on_begin(&mut self, _execution: &ProtocolExecution) {}

    /// Called after each node firing, with the new record and the
    /// trace so far
    fn process(
        &mut self,
        record: &ExecutionRecord,
        execution: &ProtocolExecution,
    ) -> ExecutionResult<()>;

    /// Called once after the run finishes
    fn on_end(&mut self, _execution: &ProtocolExecution) {}
}

/// Specialization that journals every behavior invocation.
///
/// Collects (node, behavior) pairs in firing order, a minimal
/// run sheet.
#[derive(Debug, Default)]
pub struct CallJournal {
    entries: Vec<(String, String)>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// The journaled invocations, in firing order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

impl Specialization for CallJournal {
    fn process(
        &mut self,
        record: &ExecutionRecord,
        _execution: &ProtocolExecution,
    ) -> ExecutionResult<()> {
        if let Some(call) = &record.call {
            self.entries
                .push((record.node.0.clone(), call.behavior.0.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use protocol_types::{BehaviorExecution, BehaviorId, NodeId, RecordId};

    #[test]
    fn test_journal_records_calls_only() {
        let ex = ProtocolExecution::new(BehaviorId::new("proto"), Utc::now());
        let mut journal = CallJournal::new();

        let plain = ExecutionRecord::new(RecordId(0), NodeId::new("start"), vec![]);
        journal.process(&plain, &ex).unwrap();

        let call = ExecutionRecord::new(RecordId(1), NodeId::new("step"), vec![]).with_call(
            BehaviorExecution::open(BehaviorId::new("Pipette"), vec![], Utc::now()),
        );
        journal.process(&call, &ex).unwrap();

        assert_eq!(
            journal.entries(),
            &[("step".to_string(), "Pipette".to_string())]
        );
    }
}
