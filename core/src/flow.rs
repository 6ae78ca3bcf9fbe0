//! The flow graph.
//!
//! A flow instance is the accumulated, append-only sequence of nodes and
//! sub-flows produced so far — the graph *is* the state. There is no
//! fixed set of named states; advancing a flow means appending, and
//! rewinding means loading an earlier persisted snapshot, never mutating
//! the current one in place.

use crate::config::FlowType;
use crate::error::{FlowError, Result};
use crate::ids::FlowId;
use crate::reactor::{Intent, NodeSimple};
use crate::registry::FlowRegistry;
use serde_json::json;
use std::fmt;

/// One entry of a flow's node sequence.
pub enum Node {
    /// A terminal fact.
    Simple(Box<dyn NodeSimple>),
    /// A branching intent with its own nested node sequence.
    SubFlow(Flow),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(node) => f.debug_tuple("Simple").field(&node.kind()).finish(),
            Self::SubFlow(flow) => f.debug_tuple("SubFlow").field(flow).finish(),
        }
    }
}

/// A flow: an intent plus the ordered nodes appended beneath it.
pub struct Flow {
    /// The decision point owning this (sub-)flow.
    pub intent: Box<dyn Intent>,
    /// Appended entries, oldest first.
    pub nodes: Vec<Node>,
}

impl Flow {
    /// A fresh flow with no nodes.
    #[must_use]
    pub fn new(intent: Box<dyn Intent>) -> Self {
        Self { intent, nodes: Vec::new() }
    }

    /// Total number of entries in this flow, counting nested sub-flows'
    /// entries.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Simple(_) => 1,
                Node::SubFlow(sub) => 1 + sub.total_len(),
            })
            .sum()
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        let nodes = self
            .nodes
            .iter()
            .map(|node| match node {
                Node::Simple(simple) => {
                    Ok(json!({"type": "simple", "kind": simple.kind(), "data": simple.data()?}))
                }
                Node::SubFlow(sub) => Ok(json!({"type": "sub_flow", "flow": sub.to_json()?})),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "intent": {"kind": self.intent.kind(), "data": self.intent.data()?},
            "nodes": nodes,
        }))
    }

    fn from_json(registry: &FlowRegistry, value: &serde_json::Value) -> Result<Self> {
        let intent_value = value
            .get("intent")
            .ok_or_else(|| malformed("flow is missing its intent"))?;
        let intent = decode_intent(registry, intent_value)?;
        let nodes = value
            .get("nodes")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| malformed("flow is missing its node list"))?
            .iter()
            .map(|node| Self::node_from_json(registry, node))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { intent, nodes })
    }

    fn node_from_json(registry: &FlowRegistry, value: &serde_json::Value) -> Result<Node> {
        match value.get("type").and_then(serde_json::Value::as_str) {
            Some("simple") => {
                let kind = value
                    .get("kind")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| malformed("simple node is missing its kind"))?;
                let data = value.get("data").cloned().unwrap_or(serde_json::Value::Null);
                Ok(Node::Simple(registry.new_node(kind, data)?))
            }
            Some("sub_flow") => {
                let flow = value
                    .get("flow")
                    .ok_or_else(|| malformed("sub-flow node is missing its flow"))?;
                Ok(Node::SubFlow(Self::from_json(registry, flow)?))
            }
            _ => Err(malformed("node has an unrecognized type tag")),
        }
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("intent", &self.intent.kind())
            .field("nodes", &self.nodes)
            .finish()
    }
}

fn decode_intent(registry: &FlowRegistry, value: &serde_json::Value) -> Result<Box<dyn Intent>> {
    let kind = value
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| malformed("intent is missing its kind"))?;
    let data = value.get("data").cloned().unwrap_or(serde_json::Value::Null);
    registry.new_intent(kind, data)
}

fn malformed(reason: &str) -> FlowError {
    FlowError::MalformedState { reason: reason.to_string() }
}

/// A persisted flow instance.
#[derive(Debug)]
pub struct FlowInstance {
    /// Opaque identifier, the persistence primary key.
    pub id: FlowId,
    /// Which flow definition this instance executes.
    pub flow_type: FlowType,
    /// Name of the flow definition, surfaced in responses.
    pub name: String,
    /// The root flow.
    pub root: Flow,
}

impl FlowInstance {
    /// Start a new instance from a root intent.
    #[must_use]
    pub fn new(flow_type: FlowType, name: impl Into<String>, intent: Box<dyn Intent>) -> Self {
        Self { id: FlowId::new(), flow_type, name: name.into(), root: Flow::new(intent) }
    }

    /// Serialize to a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::MalformedState`] when a node or intent fails
    /// to serialize.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(json!({
            "id": self.id,
            "flow_type": self.flow_type,
            "name": self.name,
            "flow": self.root.to_json()?,
        }))
    }

    /// Rebuild an instance from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownKind`] when a persisted kind has no
    /// registered constructor (deploy skew or corrupted storage) and
    /// [`FlowError::MalformedState`] for any other decoding failure. Both
    /// are fatal for the instance.
    pub fn from_json(registry: &FlowRegistry, value: &serde_json::Value) -> Result<Self> {
        let id = value
            .get("id")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| malformed("instance is missing its id"))?;
        let flow_type = value
            .get("flow_type")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| malformed("instance is missing its flow type"))?;
        let name = value
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| malformed("instance is missing its name"))?
            .to_string();
        let flow = value
            .get("flow")
            .ok_or_else(|| malformed("instance is missing its flow"))?;
        Ok(Self { id, flow_type, name, root: Flow::from_json(registry, flow)? })
    }
}
