//! Behavior catalog: explicit registry of invocable behaviors.
//!
//! The catalog is constructed by the caller and passed into the
//! engine; behavior resolution never goes through process-global
//! state. It maps behavior IDs to their parameter declarations and
//! implementations (primitive or graph-backed).

use protocol_types::{Behavior, BehaviorId, ExecutionError, ExecutionResult};
use std::collections::HashMap;

/// Resolves behavior IDs to their declarations
#[derive(Clone, Debug, Default)]
pub struct BehaviorCatalog {
    behaviors: HashMap<BehaviorId, Behavior>,
}

impl BehaviorCatalog {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Register a behavior
    pub fn register(&mut self, behavior: Behavior) -> ExecutionResult<BehaviorId> {
        let id = behavior.id.clone();
        if self.behaviors.contains_key(&id) {
            return Err(ExecutionError::DuplicateBehavior(id));
        }
        self.behaviors.insert(id.clone(), behavior);
        Ok(id)
    }

    /// Resolve a behavior by ID
    pub fn get(&self, id: &BehaviorId) -> ExecutionResult<&Behavior> {
        self.behaviors
            .get(id)
            .ok_or_else(|| ExecutionError::BehaviorNotFound(id.clone()))
    }

    /// Check if a behavior is registered
    pub fn contains(&self, id: &BehaviorId) -> bool {
        self.behaviors.contains_key(id)
    }

    /// Number of registered behaviors
    pub fn count(&self) -> usize {
        self.behaviors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut catalog = BehaviorCatalog::new();
        let id = catalog.register(Behavior::primitive("Pipette")).unwrap();
        assert!(catalog.contains(&id));
        assert_eq!(catalog.count(), 1);
        assert_eq!(catalog.get(&id).unwrap().id, id);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut catalog = BehaviorCatalog::new();
        catalog.register(Behavior::primitive("Pipette")).unwrap();
        let result = catalog.register(Behavior::primitive("Pipette"));
        assert!(matches!(
            result,
            Err(ExecutionError::DuplicateBehavior(_))
        ));
    }

    #[test]
    fn test_unknown_behavior() {
        let catalog = BehaviorCatalog::new();
        let result = catalog.get(&BehaviorId::new("missing"));
        assert!(matches!(result, Err(ExecutionError::BehaviorNotFound(_))));
    }
}
