//! Sub-protocol call frames.
//!
//! When a call node invokes a graph-backed behavior, the engine pushes
//! a frame and seeds the sub-graph; the sub-graph's nodes then compete
//! for firing alongside the caller's. A frame retires when its
//! sub-protocol is done: every required output bound, or, when it
//! declares no required outputs, a terminal node has fired.

use protocol_types::{BehaviorId, NodeId, ParameterValue, RecordId};

/// One open sub-protocol invocation
#[derive(Clone, Debug)]
pub struct Frame {
    /// The caller's call record, closed on retirement
    pub record: RecordId,
    /// The call node that opened this frame
    pub call_node: NodeId,
    /// The invoked graph-backed behavior
    pub behavior: BehaviorId,
    required_outputs: Vec<String>,
    outputs: Vec<ParameterValue>,
    terminal_fired: bool,
}

impl Frame {
    pub fn new(
        record: RecordId,
        call_node: NodeId,
        behavior: BehaviorId,
        required_outputs: Vec<String>,
    ) -> Self {
        Self {
            record,
            call_node,
            behavior,
            required_outputs,
            outputs: Vec::new(),
            terminal_fired: false,
        }
    }

    /// Bind an output produced inside the sub-protocol
    pub fn bind_output(&mut self, value: ParameterValue) {
        self.outputs.push(value);
    }

    /// Note that a terminal node of the sub-graph fired
    pub fn mark_terminal(&mut self) {
        self.terminal_fired = true;
    }

    /// Outputs bound so far, in binding order
    pub fn outputs(&self) -> &[ParameterValue] {
        &self.outputs
    }

    /// Check if the sub-protocol is done and the frame can retire
    pub fn retirable(&self) -> bool {
        if self.required_outputs.is_empty() {
            self.terminal_fired
        } else {
            self.required_outputs
                .iter()
                .all(|name| self.outputs.iter().any(|pv| &pv.parameter == name))
        }
    }
}

/// The stack of open sub-protocol frames
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// The innermost open frame
    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The open frame behind a given call record. Frames are keyed by
    /// the record, not the behavior, so repeated invocations of one
    /// sub-protocol stay distinct.
    pub fn frame_mut(&mut self, record: RecordId) -> Option<&mut Frame> {
        self.frames.iter_mut().find(|f| f.record == record)
    }

    /// Note a terminal firing in the invocation behind a call record,
    /// if its frame is still open
    pub fn mark_terminal(&mut self, record: RecordId) {
        if let Some(frame) = self.frame_mut(record) {
            frame.mark_terminal();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol_types::Literal;

    fn make_frame(required: &[&str]) -> Frame {
        Frame::new(
            RecordId(3),
            NodeId::new("call"),
            BehaviorId::new("Sub"),
            required.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_retires_when_required_outputs_bound() {
        let mut frame = make_frame(&["result", "waste"]);
        assert!(!frame.retirable());

        frame.bind_output(ParameterValue::new("result", Literal::string("ok")));
        assert!(!frame.retirable());

        frame.bind_output(ParameterValue::new("waste", Literal::integer(2)));
        assert!(frame.retirable());
    }

    #[test]
    fn test_retires_on_terminal_when_no_required_outputs() {
        let mut frame = make_frame(&[]);
        assert!(!frame.retirable());
        frame.mark_terminal();
        assert!(frame.retirable());
    }

    #[test]
    fn test_terminal_alone_does_not_retire_with_required_outputs() {
        let mut frame = make_frame(&["result"]);
        frame.mark_terminal();
        assert!(!frame.retirable());
    }

    #[test]
    fn test_stack_frames_are_keyed_by_record() {
        // two live invocations of the same behavior stay distinct
        let mut stack = CallStack::new();
        stack.push(make_frame(&[]));
        let inner = Frame::new(
            RecordId(7),
            NodeId::new("call-again"),
            BehaviorId::new("Sub"),
            vec![],
        );
        stack.push(inner);

        assert_eq!(stack.depth(), 2);
        stack.mark_terminal(RecordId(3));
        assert!(stack.frames[0].retirable());
        assert!(!stack.frames[1].retirable());
        stack.mark_terminal(RecordId(7));
        assert!(stack.frames[1].retirable());
    }
}
