//! Literal values carried by tokens, pins, and parameter bindings.
//!
//! Literals are a small closed set: what a guard can compare against,
//! what a ValuePin can hold, and what flows along an object edge.

use serde::{Deserialize, Serialize};

/// A literal value carried through the activity graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Literal {
    /// The absence of a value, also the trivial control-flow marker
    #[default]
    Null,
    /// A boolean value
    Boolean(bool),
    /// A signed integer value
    Integer(i64),
    /// A floating-point value
    Float(f64),
    /// A string value
    String(String),
}

impl Literal {
    /// Create a string literal
    pub fn string(v: impl Into<String>) -> Self {
        Self::String(v.into())
    }

    /// Create an integer literal
    pub fn integer(v: i64) -> Self {
        Self::Integer(v)
    }

    /// Create a boolean literal
    pub fn boolean(v: bool) -> Self {
        Self::Boolean(v)
    }

    /// Create a float literal
    pub fn float(v: f64) -> Self {
        Self::Float(v)
    }

    /// Check if this is the null literal
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// View as a string slice, if this is a string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// View as an integer, if this is an integer literal
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// View as a boolean, if this is a boolean literal
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_null() {
        assert!(Literal::default().is_null());
    }

    #[test]
    fn test_equality_for_guard_matching() {
        assert_eq!(Literal::string("A"), Literal::from("A"));
        assert_ne!(Literal::string("A"), Literal::string("B"));
        assert_eq!(Literal::integer(42), Literal::from(42));
        assert_ne!(Literal::integer(42), Literal::string("42"));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Literal::string("ok").as_str(), Some("ok"));
        assert_eq!(Literal::integer(7).as_integer(), Some(7));
        assert_eq!(Literal::boolean(true).as_boolean(), Some(true));
        assert_eq!(Literal::Null.as_str(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Literal::Null), "null");
        assert_eq!(format!("{}", Literal::string("x")), "x");
        assert_eq!(format!("{}", Literal::integer(3)), "3");
    }
}
