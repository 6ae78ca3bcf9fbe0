//! The verify step: confirm the claim behind the established identity.

use async_trait::async_trait;
use authflow_core::config::FlowPointer;
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::identity::IdentityInfo;
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use serde::{Deserialize, Serialize};

use crate::nodes::NodeVerifyClaim;

/// Owns one configured verify step. The step is skipped entirely when
/// the identity carries no verifiable claim or the claim is already
/// verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentFlowStepVerify {
    /// The step's location in the definition.
    pub pointer: FlowPointer,
}

impl IntentFlowStepVerify {
    fn pending_claim(flows: FlowView<'_>) -> Option<IdentityInfo> {
        let identity = milestone::selected_identity(flows.root)?;
        let verifiable =
            identity.login_id_type().is_some_and(authflow_core::identity::LoginIdType::is_verifiable);
        if verifiable && !identity.claim_verified {
            Some(identity)
        } else {
            None
        }
    }
}

impl Kinded for IntentFlowStepVerify {
    const KIND: &'static str = "IntentFlowStepVerify";
}

#[async_trait]
impl Intent for IntentFlowStepVerify {
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
        if flows.nearest.nodes.is_empty() && Self::pending_claim(flows).is_some() {
            // Advance by appending the waiting OTP node.
            Ok(None)
        } else {
            Err(FlowError::Eof)
        }
    }

    async fn react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        _input: &FlowInput,
    ) -> Result<ReactResult> {
        let identity = Self::pending_claim(flows).ok_or(FlowError::IncompatibleInput)?;
        let node = NodeVerifyClaim::send(deps, &identity, self.pointer.clone()).await?;
        Ok(ReactResult::Node(Box::new(node)))
    }
}
