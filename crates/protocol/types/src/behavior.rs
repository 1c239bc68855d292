//! Behaviors: the invocable units of a protocol.
//!
//! A behavior is either a *primitive* (executed by an external
//! collaborator; the engine only knows its parameter declarations) or
//! a *protocol* (implemented by another activity graph, a
//! sub-protocol). Both are resolved through an explicit catalog
//! passed to the engine; there is no global registry.

use crate::{
    ActivityGraph, ExecutionError, ExecutionResult, Parameter, ParameterDirection,
};
use serde::{Deserialize, Serialize};

/// Unique identifier for a behavior
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviorId(pub String);

impl BehaviorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a behavior is realized
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Implementation {
    /// Executed by the external primitive executor
    Primitive,
    /// Implemented by an activity graph (a sub-protocol)
    Graph(ActivityGraph),
}

/// An invocable behavior: declared parameters plus an implementation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Behavior {
    /// Unique identifier
    pub id: BehaviorId,
    /// Ordered parameter declarations
    pub parameters: Vec<Parameter>,
    /// Primitive or graph-backed
    pub implementation: Implementation,
}

impl Behavior {
    /// Declare a primitive behavior
    pub fn primitive(id: impl Into<String>) -> Self {
        Self {
            id: BehaviorId::new(id),
            parameters: Vec::new(),
            implementation: Implementation::Primitive,
        }
    }

    /// Declare a protocol behavior backed by an activity graph
    pub fn protocol(id: impl Into<String>, graph: ActivityGraph) -> Self {
        Self {
            id: BehaviorId::new(id),
            parameters: Vec::new(),
            implementation: Implementation::Graph(graph),
        }
    }

    /// Add a parameter declaration
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The backing graph, if this behavior is a protocol
    pub fn graph(&self) -> Option<&ActivityGraph> {
        match &self.implementation {
            Implementation::Graph(g) => Some(g),
            Implementation::Primitive => None,
        }
    }

    /// Check if this behavior is graph-backed
    pub fn is_protocol(&self) -> bool {
        self.graph().is_some()
    }

    /// Resolve the parameter corresponding to a named pin.
    ///
    /// Pin names must be unique per behavior; zero or more than one
    /// match is a structural error.
    pub fn pin_parameter(&self, pin_name: &str) -> ExecutionResult<&Parameter> {
        let mut matches = self.parameters.iter().filter(|p| p.name == pin_name);
        let first = matches.next().ok_or_else(|| ExecutionError::ParameterNotFound {
            behavior: self.id.clone(),
            parameter: pin_name.to_string(),
        })?;
        if matches.next().is_some() {
            return Err(ExecutionError::AmbiguousParameter {
                behavior: self.id.clone(),
                parameter: pin_name.to_string(),
            });
        }
        Ok(first)
    }

    /// All input parameters, in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_input())
    }

    /// All output parameters, in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_output())
    }

    /// Input parameters that must be supplied (no default, lower >= 1)
    pub fn required_inputs(&self) -> Vec<&Parameter> {
        self.inputs().filter(|p| p.required()).collect()
    }

    /// Output parameters that must be produced for normal completion
    pub fn required_outputs(&self) -> Vec<&Parameter> {
        self.outputs().filter(|p| p.required()).collect()
    }

    /// Look up a parameter by name and direction
    pub fn parameter(&self, name: &str, direction: ParameterDirection) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name && p.direction == direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_primitive() -> Behavior {
        Behavior::primitive("Pipette")
            .with_parameter(Parameter::input("source", 0))
            .with_parameter(Parameter::input("volume", 1).with_default(10))
            .with_parameter(Parameter::output("destination", 2))
    }

    #[test]
    fn test_pin_parameter_resolution() {
        let b = make_primitive();
        let p = b.pin_parameter("source").unwrap();
        assert_eq!(p.index, 0);

        let missing = b.pin_parameter("nope");
        assert!(matches!(
            missing,
            Err(ExecutionError::ParameterNotFound { .. })
        ));
    }

    #[test]
    fn test_pin_parameter_ambiguous() {
        let b = make_primitive().with_parameter(Parameter::output("source", 3));
        let result = b.pin_parameter("source");
        assert!(matches!(
            result,
            Err(ExecutionError::AmbiguousParameter { .. })
        ));
    }

    #[test]
    fn test_required_sets() {
        let b = make_primitive();
        let required_in: Vec<_> = b.required_inputs().iter().map(|p| p.name.clone()).collect();
        assert_eq!(required_in, vec!["source"]); // volume has a default
        assert_eq!(b.required_outputs().len(), 1);
    }

    #[test]
    fn test_primitive_has_no_graph() {
        let b = make_primitive();
        assert!(!b.is_protocol());
        assert!(b.graph().is_none());
    }
}
