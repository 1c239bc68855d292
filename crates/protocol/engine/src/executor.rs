//! The primitive executor seam.
//!
//! Primitive behaviors are carried out by an external collaborator:
//! a liquid handler driver, a simulator, a manual operator console.
//! The engine hands over the behavior declaration and the resolved
//! input values and receives back outputs and timing; it never knows
//! how the primitive was realized.

use crate::clock::LogicalClock;
use protocol_types::{Behavior, ExecutionResult, Literal, ParameterValue};
use chrono::{DateTime, Utc};

/// What a primitive invocation produced
#[derive(Clone, Debug)]
pub struct PrimitiveOutcome {
    /// Output parameter values produced by the primitive
    pub outputs: Vec<ParameterValue>,
    /// When the primitive started
    pub start_time: DateTime<Utc>,
    /// When the primitive finished
    pub end_time: DateTime<Utc>,
    /// Whether the primitive completed normally
    pub completed_normally: bool,
}

impl PrimitiveOutcome {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            outputs: Vec::new(),
            start_time,
            end_time,
            completed_normally: true,
        }
    }

    /// Add an output value
    pub fn with_output(mut self, parameter: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.outputs.push(ParameterValue::new(parameter, value));
        self
    }
}

/// Carries out primitive behaviors on behalf of the engine.
///
/// Timestamps must come from the supplied clock so that ordinal runs
/// stay reproducible.
pub trait PrimitiveExecutor {
    fn invoke(
        &mut self,
        behavior: &Behavior,
        inputs: &[ParameterValue],
        clock: &mut LogicalClock,
    ) -> ExecutionResult<PrimitiveOutcome>;
}

/// Executor that performs no external work.
///
/// Every declared output is produced as its default value, or null
/// when no default is declared. Useful for dry runs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPrimitiveExecutor;

impl PrimitiveExecutor for NullPrimitiveExecutor {
    fn invoke(
        &mut self,
        behavior: &Behavior,
        _inputs: &[ParameterValue],
        clock: &mut LogicalClock,
    ) -> ExecutionResult<PrimitiveOutcome> {
        let start = clock.now();
        let end = clock.now();
        let mut outcome = PrimitiveOutcome::new(start, end);
        for parameter in behavior.outputs() {
            let value = parameter.default.clone().unwrap_or(Literal::Null);
            outcome = outcome.with_output(parameter.name.clone(), value);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeMode;
    use protocol_types::Parameter;

    #[test]
    fn test_null_executor_produces_declared_outputs() {
        let behavior = Behavior::primitive("Measure")
            .with_parameter(Parameter::input("sample", 0))
            .with_parameter(Parameter::output("reading", 1))
            .with_parameter(Parameter::output("unit", 2).with_default("uL"));

        let mut clock = LogicalClock::start(TimeMode::Ordinal);
        let outcome = NullPrimitiveExecutor
            .invoke(&behavior, &[], &mut clock)
            .unwrap();

        assert!(outcome.completed_normally);
        assert_eq!(outcome.outputs.len(), 2);
        assert!(outcome.outputs[0].value.is_null());
        assert_eq!(outcome.outputs[1].value, Literal::string("uL"));
        assert!(outcome.end_time > outcome.start_time);
    }
}
