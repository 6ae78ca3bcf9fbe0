//! Client input shapes and their schemas.
//!
//! Each waiting step publishes an [`InputSchema`] naming the shape it
//! accepts; submitted payloads are validated structurally before any
//! reactor logic runs, so malformed JSON is rejected without touching
//! credentials or rate limits.

use authflow_core::config::{AuthenticationMethod, FlowPointer, Identification};
use authflow_core::error::{FlowError, Result};
use authflow_core::input::{validate_as, FlowActionType, InputSchema};
use serde::Deserialize;

/// Payload accepted by an identify step.
#[derive(Debug, Clone, Deserialize)]
pub struct InputIdentify {
    /// Explicit identification method; classified from the login ID when
    /// absent.
    pub identification: Option<Identification>,
    /// The submitted login ID. Absent only for anonymous identification.
    pub login_id: Option<String>,
}

/// Payload accepted by an authenticate step.
///
/// Exactly one credential field is meaningful, matching the selected
/// method; the rest stay `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct InputAuthenticate {
    /// The selected authentication method.
    pub authentication: AuthenticationMethod,
    /// Password, for password methods.
    pub password: Option<String>,
    /// TOTP code, for `secondary_totp`.
    pub code: Option<String>,
    /// Recovery code, for `recovery_code`.
    pub recovery_code: Option<String>,
    /// WebAuthn assertion, for `primary_passkey`.
    pub assertion: Option<serde_json::Value>,
}

/// Payload accepted by a step waiting on an out-of-band OTP.
#[derive(Debug, Clone, Deserialize)]
pub struct InputOobOtp {
    /// The received code.
    pub code: Option<String>,
    /// Request a fresh code instead of submitting one.
    #[serde(default)]
    pub resend: bool,
}

/// Payload accepted by a create-authenticator step.
#[derive(Debug, Clone, Deserialize)]
pub struct InputCreateAuthenticator {
    /// The method to create an authenticator for.
    pub authentication: AuthenticationMethod,
    /// New password, for password methods.
    pub new_password: Option<String>,
    /// Delivery target override, for OOB-OTP methods. Defaults to the
    /// identity's login ID.
    pub target: Option<String>,
}

/// Schema for [`InputIdentify`].
#[derive(Debug)]
pub struct IdentifySchema {
    pointer: FlowPointer,
}

impl IdentifySchema {
    pub(crate) const fn new(pointer: FlowPointer) -> Self {
        Self { pointer }
    }
}

impl InputSchema for IdentifySchema {
    fn name(&self) -> &'static str {
        "identify"
    }

    fn action_type(&self) -> FlowActionType {
        FlowActionType::Identify
    }

    fn flow_pointer(&self) -> &FlowPointer {
        &self.pointer
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<()> {
        validate_as::<InputIdentify>(raw)?;
        let input: InputIdentify = serde_json::from_value(raw.clone())?;
        // Only anonymous identification may omit the login ID.
        if input.login_id.is_none() && input.identification != Some(Identification::Anonymous) {
            return Err(FlowError::IncompatibleInput);
        }
        Ok(())
    }
}

/// Schema for [`InputAuthenticate`].
#[derive(Debug)]
pub struct AuthenticateSchema {
    pointer: FlowPointer,
}

impl AuthenticateSchema {
    pub(crate) const fn new(pointer: FlowPointer) -> Self {
        Self { pointer }
    }
}

impl InputSchema for AuthenticateSchema {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn action_type(&self) -> FlowActionType {
        FlowActionType::Authenticate
    }

    fn flow_pointer(&self) -> &FlowPointer {
        &self.pointer
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<()> {
        validate_as::<InputAuthenticate>(raw)
    }
}

/// Schema for [`InputOobOtp`], parameterized over the step kind that
/// waits on the code (authentication or claim verification).
#[derive(Debug)]
pub struct OobOtpSchema {
    pointer: FlowPointer,
    action: FlowActionType,
}

impl OobOtpSchema {
    pub(crate) const fn new(pointer: FlowPointer, action: FlowActionType) -> Self {
        Self { pointer, action }
    }
}

impl InputSchema for OobOtpSchema {
    fn name(&self) -> &'static str {
        "oob_otp"
    }

    fn action_type(&self) -> FlowActionType {
        self.action
    }

    fn flow_pointer(&self) -> &FlowPointer {
        &self.pointer
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<()> {
        validate_as::<InputOobOtp>(raw)?;
        let input: InputOobOtp = serde_json::from_value(raw.clone())?;
        // A submission is either a code or a resend request, never both.
        if input.code.is_some() == input.resend {
            return Err(FlowError::IncompatibleInput);
        }
        Ok(())
    }
}

/// Schema for [`InputCreateAuthenticator`].
#[derive(Debug)]
pub struct CreateAuthenticatorSchema {
    pointer: FlowPointer,
}

impl CreateAuthenticatorSchema {
    pub(crate) const fn new(pointer: FlowPointer) -> Self {
        Self { pointer }
    }
}

impl InputSchema for CreateAuthenticatorSchema {
    fn name(&self) -> &'static str {
        "create_authenticator"
    }

    fn action_type(&self) -> FlowActionType {
        FlowActionType::CreateAuthenticator
    }

    fn flow_pointer(&self) -> &FlowPointer {
        &self.pointer
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<()> {
        validate_as::<InputCreateAuthenticator>(raw)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn identify_requires_login_id_unless_anonymous() {
        let schema = IdentifySchema::new(FlowPointer::root().step(0));
        schema.validate(&json!({"login_id": "a@example.com"})).unwrap();
        schema.validate(&json!({"identification": "anonymous"})).unwrap();
        assert_eq!(schema.validate(&json!({})), Err(FlowError::IncompatibleInput));
    }

    #[test]
    fn oob_otp_takes_code_or_resend_but_not_both() {
        let schema =
            OobOtpSchema::new(FlowPointer::root().step(1), FlowActionType::Authenticate);
        schema.validate(&json!({"code": "123456"})).unwrap();
        schema.validate(&json!({"resend": true})).unwrap();
        assert_eq!(schema.validate(&json!({})), Err(FlowError::IncompatibleInput));
        assert_eq!(
            schema.validate(&json!({"code": "123456", "resend": true})),
            Err(FlowError::IncompatibleInput)
        );
    }

    #[test]
    fn authenticate_rejects_unknown_method_strings() {
        let schema = AuthenticateSchema::new(FlowPointer::root().step(1));
        assert_eq!(
            schema.validate(&json!({"authentication": "telepathy"})),
            Err(FlowError::IncompatibleInput)
        );
    }
}
