//! Out-of-band verification of a newly claimed email or phone.
//!
//! Appended when a verify step starts on an unverified, verifiable
//! claim; the code is delivered at construction. Claim verification has
//! no account lockout — the OTP service's own rate limits throttle it.

use async_trait::async_trait;
use authflow_core::config::FlowPointer;
use authflow_core::deps::{Dependencies, OtpChannel, OtpForm, OtpPurpose};
use authflow_core::error::{FlowError, Result};
use authflow_core::identity::{IdentityInfo, LoginIdType};
use authflow_core::ids::{IdentityId, UserId};
use authflow_core::input::{FlowActionType, FlowInput, InputSchema};
use authflow_core::reactor::{FlowView, Kinded, NodeSimple, ReactResult};
use serde::{Deserialize, Serialize};

use crate::inputs::{InputOobOtp, OobOtpSchema};
use crate::mask::{mask_email, mask_phone};
use crate::output::OtpData;

use super::NodeDoMarkClaimVerified;

/// Waits for the code delivered to the identity's claimed email/phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeVerifyClaim {
    /// The identity whose claim is being verified.
    pub identity_id: IdentityId,
    /// The owning user.
    pub user_id: UserId,
    /// Delivery channel derived from the claim type.
    pub channel: OtpChannel,
    /// The claimed value the code was sent to.
    pub target: String,
    /// The step this node executes, for the published schema.
    pub pointer: FlowPointer,
}

impl NodeVerifyClaim {
    /// Generate and deliver a verification code for `identity`'s claim,
    /// returning the waiting node.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Internal`] when the identity carries no
    /// verifiable claim; propagates OTP service failures.
    pub async fn send(
        deps: &Dependencies,
        identity: &IdentityInfo,
        pointer: FlowPointer,
    ) -> Result<Self> {
        let spec = identity
            .login_id
            .as_ref()
            .ok_or_else(|| FlowError::Internal("identity has no claim to verify".into()))?;
        let channel = match spec.r#type {
            LoginIdType::Email => OtpChannel::Email,
            LoginIdType::Phone => OtpChannel::Sms,
            LoginIdType::Username => {
                return Err(FlowError::Internal("username claims are not verifiable".into()));
            }
        };
        let target = spec.value.clone();

        deps.otp.generate(channel, &target, OtpPurpose::VerifyClaim, OtpForm::Code).await?;
        tracing::debug!(channel = ?channel, "verification OTP delivered");

        Ok(Self { identity_id: identity.id, user_id: identity.user_id, channel, target, pointer })
    }

    fn masked_target(&self) -> String {
        match self.channel {
            OtpChannel::Email => mask_email(&self.target),
            OtpChannel::Sms | OtpChannel::Whatsapp => mask_phone(&self.target),
        }
    }
}

impl Kinded for NodeVerifyClaim {
    const KIND: &'static str = "NodeVerifyClaim";
}

#[async_trait]
impl NodeSimple for NodeVerifyClaim {
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
            FlowActionType::VerifyClaim,
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
                .generate(self.channel, &self.target, OtpPurpose::VerifyClaim, OtpForm::Code)
                .await?;
            return Ok(ReactResult::Unchanged);
        }

        let code = input.code.ok_or(FlowError::IncompatibleInput)?;
        deps.otp.verify(self.channel, &self.target, OtpPurpose::VerifyClaim, &code).await?;

        Ok(ReactResult::Node(Box::new(NodeDoMarkClaimVerified {
            identity_id: self.identity_id,
            user_id: self.user_id,
        })))
    }

    async fn output_data(
        &self,
        deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        let state =
            deps.otp.inspect_state(self.channel, &self.target, OtpPurpose::VerifyClaim).await?;
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
