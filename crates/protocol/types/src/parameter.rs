//! Behavior parameters and their bound values.
//!
//! Every behavior, primitive or protocol, declares an ordered list
//! of parameters. Pins on a call and activity-parameter nodes in a
//! graph both resolve to these declarations by name.

use crate::Literal;
use serde::{Deserialize, Serialize};

/// Direction of a behavior parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterDirection {
    /// Consumed by the behavior
    In,
    /// Produced by the behavior
    Out,
}

/// A declared parameter of a behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name; pins and activity-parameter nodes match on this
    pub name: String,
    /// Direction (in or out)
    pub direction: ParameterDirection,
    /// Declaration index; call parameter values are ordered by this
    pub index: u32,
    /// Lower multiplicity bound
    pub lower: u32,
    /// Upper multiplicity bound (None = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<u32>,
    /// Default value used when no binding is supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
}

impl Parameter {
    /// Create an input parameter
    pub fn input(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            direction: ParameterDirection::In,
            index,
            lower: 1,
            upper: Some(1),
            default: None,
        }
    }

    /// Create an output parameter
    pub fn output(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            direction: ParameterDirection::Out,
            index,
            lower: 1,
            upper: Some(1),
            default: None,
        }
    }

    /// Make the parameter optional (lower bound 0)
    pub fn optional(mut self) -> Self {
        self.lower = 0;
        self
    }

    /// Attach a default value
    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// A parameter is required iff its lower bound is at least one
    /// and it has no default value.
    pub fn required(&self) -> bool {
        self.lower >= 1 && self.default.is_none()
    }

    /// Check if this is an input parameter
    pub fn is_input(&self) -> bool {
        self.direction == ParameterDirection::In
    }

    /// Check if this is an output parameter
    pub fn is_output(&self) -> bool {
        self.direction == ParameterDirection::Out
    }
}

/// A value bound to a named parameter during execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// The parameter name this value binds
    pub parameter: String,
    /// The bound value
    pub value: Literal,
}

impl ParameterValue {
    pub fn new(parameter: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.parameter, self.value)
    }
}
