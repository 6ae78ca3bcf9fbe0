//! An out-of-band OTP authentication in progress.
//!
//! Appended when an authenticate step selects an OOB-OTP branch; the
//! code is generated and delivered at construction. The node then waits
//! for the code, honoring resend requests without growing the graph.

use async_trait::async_trait;
use authflow_core::authenticator::{AuthenticatorInfo, AuthenticatorType, LockoutMethod};
use authflow_core::config::{AuthenticationMethod, FlowPointer};
use authflow_core::deps::{Dependencies, OtpChannel, OtpForm, OtpPurpose};
use authflow_core::error::{FlowError, Result};
use authflow_core::input::{FlowActionType, FlowInput, InputSchema};
use authflow_core::reactor::{FlowView, Kinded, NodeSimple, ReactResult};
use serde::{Deserialize, Serialize};

use crate::inputs::{InputOobOtp, OobOtpSchema};
use crate::mask::{mask_email, mask_phone};
use crate::output::OtpData;
use crate::policy::{guard_verification, settle_verification};

use super::NodeDoUseAuthenticatorSimple;

/// Waits for the code delivered to the chosen OOB authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeUseAuthenticatorOobOtp {
    /// The method the branch selected.
    pub method: AuthenticationMethod,
    /// The OOB authenticator being verified.
    pub authenticator: AuthenticatorInfo,
    /// Delivery channel derived from the authenticator type.
    pub channel: OtpChannel,
    /// Delivery target (the authenticator's stored claim value).
    pub target: String,
    /// The step this node executes, for the published schema.
    pub pointer: FlowPointer,
}

impl NodeUseAuthenticatorOobOtp {
    /// Generate and deliver a code for `authenticator`, returning the
    /// waiting node.
    ///
    /// # Errors
    ///
    /// Propagates delivery failures and
    /// [`FlowError::RateLimitExceeded`] from the OTP service.
    pub async fn send(
        deps: &Dependencies,
        method: AuthenticationMethod,
        authenticator: AuthenticatorInfo,
        pointer: FlowPointer,
    ) -> Result<Self> {
        let channel = match authenticator.r#type {
            AuthenticatorType::OobOtpEmail => OtpChannel::Email,
            AuthenticatorType::OobOtpSms => OtpChannel::Sms,
            other => {
                return Err(FlowError::Internal(format!(
                    "authenticator type {other:?} cannot receive an OOB OTP"
                )));
            }
        };
        let target = authenticator.oob_target.clone().ok_or_else(|| {
            FlowError::Internal("OOB authenticator has no delivery target".into())
        })?;

        deps.otp.generate(channel, &target, OtpPurpose::Authenticate, OtpForm::Code).await?;
        tracing::debug!(channel = ?channel, "OOB OTP delivered for authentication");

        Ok(Self { method, authenticator, channel, target, pointer })
    }

    fn masked_target(&self) -> String {
        match self.channel {
            OtpChannel::Email => mask_email(&self.target),
            OtpChannel::Sms | OtpChannel::Whatsapp => mask_phone(&self.target),
        }
    }
}

impl Kinded for NodeUseAuthenticatorOobOtp {
    const KIND: &'static str = "NodeUseAuthenticatorOobOtp";
}

#[async_trait]
impl NodeSimple for NodeUseAuthenticatorOobOtp {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>> {
        Ok(Some(Box::new(OobOtpSchema::new(
            self.pointer.clone(),
            FlowActionType::Authenticate,
        ))))
    }

    async fn react_to(
        &self,
        deps: &Dependencies,
        _flows: FlowView<'_>,
        input: &FlowInput,
    ) -> Result<ReactResult> {
        let input: InputOobOtp = input.get().ok_or(FlowError::IncompatibleInput)?;

        if input.resend {
            deps.otp
                .generate(self.channel, &self.target, OtpPurpose::Authenticate, OtpForm::Code)
                .await?;
            return Ok(ReactResult::Unchanged);
        }

        let code = input.code.ok_or(FlowError::IncompatibleInput)?;
        let user_id = self.authenticator.user_id;
        let lockout = Some(LockoutMethod::OobOtp);

        guard_verification(deps, user_id, lockout).await?;
        let outcome =
            deps.otp.verify(self.channel, &self.target, OtpPurpose::Authenticate, &code).await;
        settle_verification(deps, user_id, lockout, outcome).await?;

        Ok(ReactResult::Node(Box::new(NodeDoUseAuthenticatorSimple {
            method: self.method,
            authenticator: self.authenticator.clone(),
        })))
    }

    async fn output_data(
        &self,
        deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        let state =
            deps.otp.inspect_state(self.channel, &self.target, OtpPurpose::Authenticate).await?;
        let data = OtpData {
            channel: self.channel,
            masked_claim_value: self.masked_target(),
            code_length: deps.config.otp.code_length,
            can_resend_at: state.can_resend_at,
            failed_attempt_rate_limit_exceeded: state.failed_attempt_rate_limit_exceeded,
        };
        Ok(Some(serde_json::to_value(data)?))
    }
}
