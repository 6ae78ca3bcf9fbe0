//! The login flow root.

use async_trait::async_trait;
use authflow_core::config::{FlowPointer, FlowType};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use authflow_core::session::SessionAttrs;
use serde::{Deserialize, Serialize};

use crate::nodes::NodeDoCreateSession;
use crate::policy::determined_user;

use super::IntentFlowSteps;

/// Runs the configured login flow: execute its steps, then derive the
/// session from the milestones the steps left behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentLoginFlow {
    /// The flow definition's name, echoed in responses.
    pub name: String,
}

impl Kinded for IntentLoginFlow {
    const KIND: &'static str = "IntentLoginFlow";
}

#[async_trait]
impl Intent for IntentLoginFlow {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        flows: FlowView<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>> {
        match flows.nearest.nodes.len() {
            0 | 1 => Ok(None),
            _ => Err(FlowError::Eof),
        }
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        flows: FlowView<'_>,
        _input: &FlowInput,
    ) -> Result<ReactResult> {
        match flows.nearest.nodes.len() {
            0 => Ok(ReactResult::SubFlow(Box::new(IntentFlowSteps {
                flow_type: FlowType::Login,
                pointer: FlowPointer::root(),
            }))),
            1 => {
                let user_id = determined_user(flows.root)?;
                let amr = milestone::collect_amr(flows.root);
                Ok(ReactResult::Node(Box::new(NodeDoCreateSession {
                    attrs: SessionAttrs { user_id, amr, flow_type: FlowType::Login },
                })))
            }
            _ => Err(FlowError::IncompatibleInput),
        }
    }
}
