//! The node/intent kind registry.
//!
//! Persisted graphs store a `kind` discriminator per entry; the registry
//! maps each kind back to a constructor for the concrete type. It is
//! populated once by an explicit registration call during application
//! bootstrap, then shared read-only — no locking on lookups.

use crate::error::{FlowError, Result};
use crate::reactor::{Intent, Kinded, NodeSimple};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

type IntentFactory = fn(serde_json::Value) -> Result<Box<dyn Intent>>;
type NodeFactory = fn(serde_json::Value) -> Result<Box<dyn NodeSimple>>;

/// Maps kind discriminators to constructors for persisted flow entries.
#[derive(Default)]
pub struct FlowRegistry {
    intents: HashMap<&'static str, IntentFactory>,
    nodes: HashMap<&'static str, NodeFactory>,
}

impl FlowRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intent type under its [`Kinded::KIND`].
    pub fn register_intent<T>(&mut self)
    where
        T: Intent + Kinded + DeserializeOwned + 'static,
    {
        self.intents.insert(T::KIND, |data| {
            let intent: T = serde_json::from_value(data)?;
            Ok(Box::new(intent))
        });
    }

    /// Register a node type under its [`Kinded::KIND`].
    pub fn register_node<T>(&mut self)
    where
        T: NodeSimple + Kinded + DeserializeOwned + 'static,
    {
        self.nodes.insert(T::KIND, |data| {
            let node: T = serde_json::from_value(data)?;
            Ok(Box::new(node))
        });
    }

    /// Construct a registered intent from its persisted data.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownKind`] when `kind` was never
    /// registered. The owning flow instance is corrupted and must not be
    /// retried.
    pub fn new_intent(&self, kind: &str, data: serde_json::Value) -> Result<Box<dyn Intent>> {
        match self.intents.get(kind) {
            Some(factory) => factory(data),
            None => {
                tracing::error!(kind, "persisted intent kind has no registered constructor");
                Err(FlowError::UnknownKind { kind: kind.to_string() })
            }
        }
    }

    /// Construct a registered node from its persisted data.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownKind`] when `kind` was never
    /// registered.
    pub fn new_node(&self, kind: &str, data: serde_json::Value) -> Result<Box<dyn NodeSimple>> {
        match self.nodes.get(kind) {
            Some(factory) => factory(data),
            None => {
                tracing::error!(kind, "persisted node kind has no registered constructor");
                Err(FlowError::UnknownKind { kind: kind.to_string() })
            }
        }
    }

    /// Kinds registered so far, for bootstrap sanity checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len() + self.nodes.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_fatal() {
        let registry = FlowRegistry::new();
        let err = registry.new_node("NodeNeverRegistered", serde_json::Value::Null);
        assert!(matches!(err, Err(FlowError::UnknownKind { kind }) if kind == "NodeNeverRegistered"));
    }
}
