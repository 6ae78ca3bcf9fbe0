//! The input reactor protocol.
//!
//! Every intent and node decides for itself whether it can accept further
//! input and what to do with it — there is no central dispatch over
//! concrete types, so new authentication methods are added by
//! implementing these traits, never by editing the engine.

use crate::deps::Dependencies;
use crate::error::Result;
use crate::flow::Flow;
use crate::input::{FlowInput, InputSchema};
use crate::milestone::Milestone;
use crate::effect::Effect;
use async_trait::async_trait;
use smallvec::SmallVec;
use std::fmt;

/// Associates a type with its stable kind discriminator, used for
/// registry registration. The instance-level [`Intent::kind`] /
/// [`NodeSimple::kind`] must return the same string.
pub trait Kinded {
    /// The stable kind discriminator persisted with this type.
    const KIND: &'static str;
}

/// Read-only view of the graph handed to a reactor.
#[derive(Clone, Copy)]
pub struct FlowView<'a> {
    /// The whole flow instance, for milestone walks.
    pub root: &'a Flow,
    /// The flow the reacting entry belongs to (its own sub-flow).
    pub nearest: &'a Flow,
}

/// What a successful reaction appends to the graph.
pub enum ReactResult {
    /// Append a terminal fact.
    Node(Box<dyn NodeSimple>),
    /// Open a sub-flow owned by a new intent.
    SubFlow(Box<dyn Intent>),
    /// The input was handled entirely through side effects (e.g. an OTP
    /// resend); the graph is left untouched.
    Unchanged,
}

impl fmt::Debug for ReactResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => f.debug_tuple("Node").field(&node.kind()).finish(),
            Self::SubFlow(intent) => f.debug_tuple("SubFlow").field(&intent.kind()).finish(),
            Self::Unchanged => write!(f, "Unchanged"),
        }
    }
}

/// An in-progress decision point owning a sub-sequence of nodes.
#[async_trait]
pub trait Intent: fmt::Debug + Send + Sync {
    /// Stable kind discriminator for persistence.
    fn kind(&self) -> &'static str;

    /// Serialize the intent's own fields (without the kind envelope).
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::MalformedState`] when serialization
    /// fails.
    fn data(&self) -> Result<serde_json::Value>;

    /// Milestone probes this intent answers, if any.
    fn milestone(&self) -> Option<&dyn Milestone> {
        None
    }

    /// Whether this intent can accept further input.
    ///
    /// `Ok(Some(schema))` waits for a payload matching `schema`;
    /// `Ok(None)` advances without client input; `Err(Eof)` declares the
    /// intent finished.
    ///
    /// This is invoked speculatively (e.g. to render available options),
    /// so it must be free of side effects beyond read-only lookups.
    async fn can_react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>>;

    /// React to one input, producing the next graph entry.
    async fn react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        input: &FlowInput,
    ) -> Result<ReactResult>;

    /// Side effects to apply when the flow commits. Never invoked during
    /// speculative edge derivation.
    async fn effects(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<SmallVec<[Effect; 4]>> {
        Ok(SmallVec::new())
    }

    /// Pure projection of this intent's current options, safe to call
    /// repeatedly before commit.
    async fn output_data(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }
}

/// A committed, immutable fact within a flow.
///
/// Most nodes are inert facts; a node that represents a pending
/// credential check (e.g. "password authenticator chosen, waiting for the
/// password") overrides the reactor methods.
#[async_trait]
pub trait NodeSimple: fmt::Debug + Send + Sync {
    /// Stable kind discriminator for persistence.
    fn kind(&self) -> &'static str;

    /// Serialize the node's own fields (without the kind envelope).
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::MalformedState`] when serialization
    /// fails.
    fn data(&self) -> Result<serde_json::Value>;

    /// Milestone probes this node answers, if any.
    fn milestone(&self) -> Option<&dyn Milestone> {
        None
    }

    /// Whether this node still accepts input. Inert facts keep the
    /// default.
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>> {
        Err(crate::FlowError::Eof)
    }

    /// React to one input. Inert facts keep the default.
    async fn react_to(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
        _input: &FlowInput,
    ) -> Result<ReactResult> {
        Err(crate::FlowError::IncompatibleInput)
    }

    /// Side effects to apply when the flow commits.
    async fn effects(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<SmallVec<[Effect; 4]>> {
        Ok(SmallVec::new())
    }

    /// Pure projection of this node's current state, safe to call
    /// repeatedly before commit.
    async fn output_data(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }
}
