//! The reauthentication flow root.

use async_trait::async_trait;
use authflow_core::config::{FlowPointer, FlowType};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::ids::UserId;
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone::{self, Milestone};
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use authflow_core::session::SessionAttrs;
use serde::{Deserialize, Serialize};

use crate::nodes::NodeDoCreateSession;

use super::IntentFlowSteps;

/// Runs the configured reauth flow for an already-known user. There is
/// no identify step: the intent itself pins the flow to the user the
/// existing session belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentReauthFlow {
    /// The flow definition's name, echoed in responses.
    pub name: String,
    /// The user re-verifying their presence.
    pub user_id: UserId,
}

impl Kinded for IntentReauthFlow {
    const KIND: &'static str = "IntentReauthFlow";
}

impl Milestone for IntentReauthFlow {
    fn did_determine_user(&self) -> Option<UserId> {
        Some(self.user_id)
    }
}

#[async_trait]
impl Intent for IntentReauthFlow {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn milestone(&self) -> Option<&dyn Milestone> {
        Some(self)
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
                flow_type: FlowType::Reauth,
                pointer: FlowPointer::root(),
            }))),
            1 => {
                let amr = milestone::collect_amr(flows.root);
                Ok(ReactResult::Node(Box::new(NodeDoCreateSession {
                    attrs: SessionAttrs {
                        user_id: self.user_id,
                        amr,
                        flow_type: FlowType::Reauth,
                    },
                })))
            }
            _ => Err(FlowError::IncompatibleInput),
        }
    }
}
