//! The create-authenticator step: enroll a new authenticator.

use async_trait::async_trait;
use authflow_core::authenticator::{AuthenticatorSpec, AuthenticatorType};
use authflow_core::config::{
    AuthenticationBranch, FlowPointer, FlowStepConfig, FlowType,
};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::flow::Node;
use authflow_core::identity::LoginIdType;
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use serde::{Deserialize, Serialize};

use crate::inputs::{CreateAuthenticatorSchema, InputCreateAuthenticator};
use crate::nodes::NodeDoCreateAuthenticator;
use crate::output::CreateAuthenticatorData;
use crate::policy::determined_user;

use super::IntentFlowSteps;

/// Owns one configured create-authenticator step. The authenticator is
/// built (secret material hashed) during the flow but persisted only at
/// commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentFlowStepCreateAuthenticator {
    /// Which flow definition this step belongs to.
    pub flow_type: FlowType,
    /// The step's location in the definition.
    pub pointer: FlowPointer,
}

impl IntentFlowStepCreateAuthenticator {
    fn one_of<'a>(&self, deps: &'a Dependencies) -> Result<&'a [AuthenticationBranch]> {
        match self.pointer.resolve(deps.config.flow(self.flow_type))? {
            FlowStepConfig::CreateAuthenticator { one_of } => Ok(one_of),
            _ => Err(FlowError::MalformedState {
                reason: format!("pointer {} is not a create-authenticator step", self.pointer),
            }),
        }
    }

    fn created(flows: FlowView<'_>) -> bool {
        !milestone::collect(flows.nearest, |m| m.authentication_method()).is_empty()
    }

    fn branch_opened(flows: FlowView<'_>) -> bool {
        matches!(flows.nearest.nodes.last(), Some(Node::SubFlow(_)))
    }

    fn taken_branch(&self, deps: &Dependencies, flows: FlowView<'_>) -> Result<usize> {
        let method = milestone::find_last(flows.nearest, |m| m.authentication_method())
            .ok_or_else(|| {
                FlowError::Internal("create-authenticator step has no method milestone".into())
            })?;
        self.one_of(deps)?
            .iter()
            .position(|branch| branch.authentication == method)
            .ok_or_else(|| FlowError::Internal("created method matches no branch".into()))
    }

    async fn create(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        input: &InputCreateAuthenticator,
    ) -> Result<ReactResult> {
        let one_of = self.one_of(deps)?;
        let method = input.authentication;
        if !one_of.iter().any(|branch| branch.authentication == method) {
            return Err(FlowError::InvalidAuthenticationMethod {
                allowed: one_of.iter().map(|b| b.authentication.as_str().to_string()).collect(),
                actual: method.as_str().to_string(),
            });
        }
        let (kind, r#type) = match (method.authenticator_kind(), method.authenticator_type()) {
            (Some(kind), Some(r#type)) => (kind, r#type),
            _ => {
                return Err(FlowError::ConfigurationViolated {
                    reason: format!("{} cannot be created in a flow", method.as_str()),
                });
            }
        };
        let user_id = determined_user(flows.root)?;

        let spec = match r#type {
            AuthenticatorType::Password => {
                let password = input.new_password.clone().ok_or(FlowError::IncompatibleInput)?;
                AuthenticatorSpec::Password { plain_password: password }
            }
            AuthenticatorType::OobOtpEmail | AuthenticatorType::OobOtpSms => {
                let target = match input.target.clone() {
                    Some(target) => target,
                    None => self.default_oob_target(flows, r#type)?,
                };
                AuthenticatorSpec::OobOtp { target }
            }
            AuthenticatorType::Totp | AuthenticatorType::Passkey => {
                // Enrollment needs a provisioning exchange these flows do
                // not model.
                return Err(FlowError::ConfigurationViolated {
                    reason: format!("{} cannot be created in a flow", method.as_str()),
                });
            }
        };

        // First authenticator of its kind becomes the default.
        let same_kind = authflow_core::authenticator::keep_kind(kind);
        let existing = deps.authenticators.list(user_id, &[&same_kind]).await?;
        let is_default = existing.is_empty();

        let authenticator =
            deps.authenticators.new_from_spec(user_id, kind, r#type, &spec, is_default).await?;
        Ok(ReactResult::Node(Box::new(NodeDoCreateAuthenticator { method, authenticator })))
    }

    /// The identity's claim value, when it matches the OOB channel.
    fn default_oob_target(&self, flows: FlowView<'_>, r#type: AuthenticatorType) -> Result<String> {
        let identity = milestone::selected_identity(flows.root)
            .ok_or(FlowError::IncompatibleInput)?;
        let wanted = match r#type {
            AuthenticatorType::OobOtpEmail => LoginIdType::Email,
            AuthenticatorType::OobOtpSms => LoginIdType::Phone,
            _ => return Err(FlowError::IncompatibleInput),
        };
        match (&identity.login_id_type(), identity.login_id_value()) {
            (Some(t), Some(value)) if *t == wanted => Ok(value.to_string()),
            _ => Err(FlowError::IncompatibleInput),
        }
    }
}

impl Kinded for IntentFlowStepCreateAuthenticator {
    const KIND: &'static str = "IntentFlowStepCreateAuthenticator";
}

#[async_trait]
impl Intent for IntentFlowStepCreateAuthenticator {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    async fn can_react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>> {
        if flows.nearest.nodes.is_empty() {
            return Ok(Some(Box::new(CreateAuthenticatorSchema::new(self.pointer.clone()))));
        }
        if Self::created(flows) && !Self::branch_opened(flows) {
            let branch = self.taken_branch(deps, flows)?;
            let config = deps.config.flow(self.flow_type);
            if !self.pointer.resolve_branch_steps(config, branch)?.is_empty() {
                return Ok(None);
            }
        }
        Err(FlowError::Eof)
    }

    async fn react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        input: &FlowInput,
    ) -> Result<ReactResult> {
        if flows.nearest.nodes.is_empty() {
            let input: InputCreateAuthenticator =
                input.get().ok_or(FlowError::IncompatibleInput)?;
            return self.create(deps, flows, &input).await;
        }
        if Self::created(flows) && !Self::branch_opened(flows) {
            let branch = self.taken_branch(deps, flows)?;
            return Ok(ReactResult::SubFlow(Box::new(IntentFlowSteps {
                flow_type: self.flow_type,
                pointer: self.pointer.one_of(branch),
            })));
        }
        Err(FlowError::IncompatibleInput)
    }

    async fn output_data(
        &self,
        deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        let options = self.one_of(deps)?.iter().map(|b| b.authentication).collect();
        let data = CreateAuthenticatorData { options };
        Ok(Some(serde_json::to_value(data)?))
    }
}
