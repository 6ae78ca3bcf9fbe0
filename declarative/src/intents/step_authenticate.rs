//! The authenticate step: verify one of the user's authenticators.

use async_trait::async_trait;
use authflow_core::authenticator::{AuthenticatorSpec, AuthenticatorType, LockoutMethod};
use authflow_core::config::{
    AuthenticationBranch, AuthenticationMethod, FlowPointer, FlowStepConfig, FlowType,
};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::flow::{Flow, Node};
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use serde::{Deserialize, Serialize};

use crate::inputs::{AuthenticateSchema, InputAuthenticate};
use crate::nodes::{NodeDoUseAuthenticatorSimple, NodeDoUseRecoveryCode, NodeUseAuthenticatorOobOtp};
use crate::output::AuthenticationData;
use crate::policy::{
    authentication_options, determined_user, guard_verification, invalid_method,
    settle_verification, usable_authentication_methods, UsableMethod,
};

use super::IntentFlowSteps;

/// Owns one configured authenticate step.
///
/// The usable branch subset is derived from the live stores on every
/// inspection, never cached; construction fails up front when the user
/// can take no branch at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentFlowStepAuthenticate {
    /// Which flow definition this step belongs to.
    pub flow_type: FlowType,
    /// The step's location in the definition.
    pub pointer: FlowPointer,
}

impl IntentFlowStepAuthenticate {
    /// Construct the step, rejecting it when no configured branch is
    /// usable by the determined user.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NoUsableAuthenticationMethod`] when every
    /// branch is unusable — the whole flow is stuck and must restart.
    pub async fn new(
        deps: &Dependencies,
        root: &Flow,
        flow_type: FlowType,
        pointer: FlowPointer,
    ) -> Result<Self> {
        let step = Self { flow_type, pointer };
        let usable = step.usable(deps, root).await?;
        if usable.is_empty() {
            return Err(FlowError::NoUsableAuthenticationMethod);
        }
        Ok(step)
    }

    fn one_of<'a>(&self, deps: &'a Dependencies) -> Result<&'a [AuthenticationBranch]> {
        match self.pointer.resolve(deps.config.flow(self.flow_type))? {
            FlowStepConfig::Authenticate { one_of } => Ok(one_of),
            _ => Err(FlowError::MalformedState {
                reason: format!("pointer {} is not an authenticate step", self.pointer),
            }),
        }
    }

    async fn usable(&self, deps: &Dependencies, root: &Flow) -> Result<Vec<UsableMethod>> {
        let one_of = self.one_of(deps)?;
        usable_authentication_methods(deps, root, one_of).await
    }

    fn authenticated(flows: FlowView<'_>) -> bool {
        !milestone::collect(flows.nearest, |m| m.did_authenticate()).is_empty()
    }

    fn branch_opened(flows: FlowView<'_>) -> bool {
        matches!(flows.nearest.nodes.last(), Some(Node::SubFlow(_)))
    }

    /// The branch index matching the method that authenticated.
    fn taken_branch(&self, deps: &Dependencies, flows: FlowView<'_>) -> Result<usize> {
        let method = milestone::find_last(flows.nearest, |m| m.authentication_method())
            .ok_or_else(|| {
                FlowError::Internal("authenticate step has no authentication milestone".into())
            })?;
        self.one_of(deps)?
            .iter()
            .position(|branch| branch.authentication == method)
            .ok_or_else(|| FlowError::Internal("authenticated method matches no branch".into()))
    }

    async fn authenticate(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        input: &InputAuthenticate,
    ) -> Result<ReactResult> {
        let usable = self.usable(deps, flows.root).await?;
        let method = input.authentication;
        let entry = usable
            .iter()
            .find(|u| u.method == method)
            .ok_or_else(|| invalid_method(&usable, method))?;
        let user_id = determined_user(flows.root)?;

        match method.authenticator_type() {
            Some(AuthenticatorType::Password) => {
                let password = input.password.clone().ok_or(FlowError::IncompatibleInput)?;
                let spec = AuthenticatorSpec::Password { plain_password: password };
                self.verify_simple(
                    deps,
                    user_id,
                    method,
                    AuthenticatorType::Password,
                    entry,
                    &spec,
                )
                .await
            }
            Some(AuthenticatorType::Totp) => {
                let code = input.code.clone().ok_or(FlowError::IncompatibleInput)?;
                let spec = AuthenticatorSpec::Totp { code };
                self.verify_simple(deps, user_id, method, AuthenticatorType::Totp, entry, &spec)
                    .await
            }
            Some(AuthenticatorType::Passkey) => {
                let assertion = input.assertion.as_ref().ok_or(FlowError::IncompatibleInput)?;
                let authenticator = deps.passkeys.verify_assertion(user_id, assertion).await?;
                Ok(ReactResult::Node(Box::new(NodeDoUseAuthenticatorSimple {
                    method,
                    authenticator,
                })))
            }
            Some(AuthenticatorType::OobOtpEmail | AuthenticatorType::OobOtpSms) => {
                let authenticator = entry.authenticators.first().cloned().ok_or_else(|| {
                    FlowError::Internal("usable OOB branch has no authenticator".into())
                })?;
                let node = NodeUseAuthenticatorOobOtp::send(
                    deps,
                    method,
                    authenticator,
                    self.pointer.clone(),
                )
                .await?;
                Ok(ReactResult::Node(Box::new(node)))
            }
            None => {
                // Recovery code: consumed atomically at verification time.
                let code = input.recovery_code.clone().ok_or(FlowError::IncompatibleInput)?;
                let lockout = Some(LockoutMethod::RecoveryCode);
                guard_verification(deps, user_id, lockout).await?;
                let outcome = deps.recovery_codes.consume(user_id, &code).await;
                settle_verification(deps, user_id, lockout, outcome).await?;
                Ok(ReactResult::Node(Box::new(NodeDoUseRecoveryCode::default())))
            }
        }
    }

    async fn verify_simple(
        &self,
        deps: &Dependencies,
        user_id: authflow_core::ids::UserId,
        method: AuthenticationMethod,
        r#type: AuthenticatorType,
        entry: &UsableMethod,
        spec: &AuthenticatorSpec,
    ) -> Result<ReactResult> {
        let lockout = r#type.lockout_method();
        guard_verification(deps, user_id, lockout).await?;
        let outcome = deps
            .authenticators
            .verify_with_spec(user_id, r#type, &entry.authenticators, spec)
            .await;
        let verified = settle_verification(deps, user_id, lockout, outcome).await?;
        Ok(ReactResult::Node(Box::new(NodeDoUseAuthenticatorSimple {
            method,
            authenticator: verified.authenticator,
        })))
    }
}

impl Kinded for IntentFlowStepAuthenticate {
    const KIND: &'static str = "IntentFlowStepAuthenticate";
}

#[async_trait]
impl Intent for IntentFlowStepAuthenticate {
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
            return Ok(Some(Box::new(AuthenticateSchema::new(self.pointer.clone()))));
        }
        if Self::authenticated(flows) && !Self::branch_opened(flows) {
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
            let input: InputAuthenticate = input.get().ok_or(FlowError::IncompatibleInput)?;
            return self.authenticate(deps, flows, &input).await;
        }
        if Self::authenticated(flows) && !Self::branch_opened(flows) {
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
        flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        let usable = self.usable(deps, flows.root).await?;
        let data = AuthenticationData { options: authentication_options(&usable) };
        Ok(Some(serde_json::to_value(data)?))
    }
}
