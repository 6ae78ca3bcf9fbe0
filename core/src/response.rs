//! Client-facing snapshot of a flow instance.
//!
//! A response tells the client which instance it is driving, which
//! action to render next, and the presentation data the current reactor
//! chose to expose. It is derived from the graph on demand and never
//! mutates anything.

use serde::Serialize;

use crate::config::FlowType;
use crate::deps::Dependencies;
use crate::error::Result;
use crate::flow::FlowInstance;
use crate::input::FlowActionType;
use crate::traversal::{self, InputReactorLocation};

/// The next action a client should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowAction {
    /// What kind of step the flow waits on.
    #[serde(rename = "type")]
    pub action_type: FlowActionType,
    /// Step-specific presentation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// What a client sees of a flow instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowResponse {
    /// The instance identifier, echoed back on every subsequent input.
    pub id: crate::ids::FlowId,
    /// Which flow definition is executing.
    pub flow_type: FlowType,
    /// The flow definition's name.
    pub name: String,
    /// The current step.
    pub action: FlowAction,
}

impl FlowResponse {
    /// A response for a flow that has finished.
    #[must_use]
    pub fn finished(instance: &FlowInstance, data: Option<serde_json::Value>) -> Self {
        Self {
            id: instance.id,
            flow_type: instance.flow_type,
            name: instance.name.clone(),
            action: FlowAction { action_type: FlowActionType::Finished, data },
        }
    }

    /// A response for a flow resting at the given reactor.
    ///
    /// # Errors
    ///
    /// Propagates the reactor's `output_data` error.
    pub async fn at_reactor(
        deps: &Dependencies,
        instance: &FlowInstance,
        location: &InputReactorLocation,
    ) -> Result<Self> {
        let data = traversal::reactor_output_data(deps, &instance.root, location).await?;
        let action_type = location
            .schema
            .as_ref()
            .map_or(FlowActionType::Finished, |schema| schema.action_type());
        Ok(Self {
            id: instance.id,
            flow_type: instance.flow_type,
            name: instance.name.clone(),
            action: FlowAction { action_type, data },
        })
    }
}
