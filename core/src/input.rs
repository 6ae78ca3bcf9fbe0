//! External input handling.
//!
//! Inputs are short-lived JSON payloads. A reactor declares the shape it
//! accepts via an [`InputSchema`]; the engine validates the raw payload
//! against that schema before dispatching it, so a structural mismatch is
//! rejected as a caller error without touching flow state. Inside
//! `react_to`, reactors probe the payload with [`FlowInput::get`], which
//! deliberately accepts any payload the target type can be deserialized
//! from — several node variants may accept structurally similar inputs.

use crate::config::FlowPointer;
use crate::error::{FlowError, Result};
use serde::de::DeserializeOwned;
use std::fmt;

/// Which kind of action the current step asks the client to perform.
/// Drives the `action.type` field of a flow response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowActionType {
    /// Select and submit a login ID.
    Identify,
    /// Select an authentication method or submit a credential.
    Authenticate,
    /// Submit (or resend) an out-of-band verification code.
    VerifyClaim,
    /// Provide data for a new authenticator.
    CreateAuthenticator,
    /// Nothing left to do; the flow is finished.
    Finished,
}

/// A raw external input payload.
#[derive(Debug, Clone, Default)]
pub struct FlowInput(serde_json::Value);

impl FlowInput {
    /// Wrap a raw JSON payload.
    #[must_use]
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    /// An empty input, used when a reactor advances without client input.
    #[must_use]
    pub fn empty() -> Self {
        Self(serde_json::Value::Null)
    }

    /// Whether this input carries no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    /// Probe the payload as a typed input.
    ///
    /// Returns `None` when the payload does not have the shape of `T`;
    /// the caller then falls through to its next accepted input type, or
    /// rejects with [`FlowError::IncompatibleInput`].
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.0.clone()).ok()
    }

    /// The raw payload.
    #[must_use]
    pub const fn raw(&self) -> &serde_json::Value {
        &self.0
    }
}

/// The input shape the currently accepting reactor expects.
///
/// Implementations validate structurally only: semantic checks (wrong
/// password, disallowed method) happen inside `react_to` and surface as
/// domain errors instead.
pub trait InputSchema: fmt::Debug + Send + Sync {
    /// Stable name of the accepted shape, e.g. `take_password`.
    fn name(&self) -> &'static str;

    /// The action clients should render for this step.
    fn action_type(&self) -> FlowActionType;

    /// Where in the flow definition the accepting step lives.
    fn flow_pointer(&self) -> &FlowPointer;

    /// Structural validation of a raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::IncompatibleInput`] when the payload does not
    /// match the accepted shape.
    fn validate(&self, raw: &serde_json::Value) -> Result<()>;
}

/// Helper for schema implementations: validate by attempting to
/// deserialize the payload as `T`.
///
/// # Errors
///
/// Returns [`FlowError::IncompatibleInput`] when deserialization fails.
pub fn validate_as<T: DeserializeOwned>(raw: &serde_json::Value) -> Result<()> {
    serde_json::from_value::<T>(raw.clone()).map(|_| ()).map_err(|err| {
        tracing::debug!(error = %err, "input failed structural validation");
        FlowError::IncompatibleInput
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TakePassword {
        password: String,
    }

    #[test]
    fn get_probes_shape() {
        let input = FlowInput::new(serde_json::json!({"password": "secret"}));
        let parsed: Option<TakePassword> = input.get();
        assert_eq!(parsed.map(|p| p.password), Some("secret".to_string()));

        let wrong = FlowInput::new(serde_json::json!({"code": "123456"}));
        assert!(wrong.get::<TakePassword>().is_none());
    }

    #[test]
    fn validate_as_rejects_wrong_shape() {
        let raw = serde_json::json!({"code": "123456"});
        assert_eq!(validate_as::<TakePassword>(&raw), Err(FlowError::IncompatibleInput));
        assert!(validate_as::<TakePassword>(&serde_json::json!({"password": "x"})).is_ok());
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(FlowInput::empty().is_empty());
        assert!(!FlowInput::new(serde_json::json!({})).is_empty());
    }
}
