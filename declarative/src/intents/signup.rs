//! The signup flow root.

use async_trait::async_trait;
use authflow_core::config::{FlowPointer, FlowType};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::ids::UserId;
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use authflow_core::session::SessionAttrs;
use serde::{Deserialize, Serialize};

use crate::nodes::{NodeDoCreateSession, NodeDoCreateUser};
use crate::policy::determined_user;

use super::IntentFlowSteps;

/// Runs the configured signup flow: allocate the user up front so every
/// later step can reference it, execute the steps, then derive the
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSignupFlow {
    /// The flow definition's name, echoed in responses.
    pub name: String,
}

impl Kinded for IntentSignupFlow {
    const KIND: &'static str = "IntentSignupFlow";
}

#[async_trait]
impl Intent for IntentSignupFlow {
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
            0..=2 => Ok(None),
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
            0 => Ok(ReactResult::Node(Box::new(NodeDoCreateUser { user_id: UserId::new() }))),
            1 => Ok(ReactResult::SubFlow(Box::new(IntentFlowSteps {
                flow_type: FlowType::Signup,
                pointer: FlowPointer::root(),
            }))),
            2 => {
                let user_id = determined_user(flows.root)?;
                let amr = milestone::collect_amr(flows.root);
                Ok(ReactResult::Node(Box::new(NodeDoCreateSession {
                    attrs: SessionAttrs { user_id, amr, flow_type: FlowType::Signup },
                })))
            }
            _ => Err(FlowError::IncompatibleInput),
        }
    }
}
