//! Tenant flow configuration.
//!
//! A flow definition is an ordered list of steps; branching steps carry
//! `one_of` branches which may themselves nest further steps. The engine
//! locates the step an intent is executing with a [`FlowPointer`] into
//! this structure, so configuration is re-read on every inspection and
//! never copied into persisted flow state.

use crate::authenticator::{AuthenticatorKind, AuthenticatorType};
use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which flow definition a flow instance executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// Authenticate an existing user.
    Login,
    /// Create a new user.
    Signup,
    /// Re-verify an already-authenticated user.
    Reauth,
}

impl FlowType {
    /// Stable string form used in responses and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Reauth => "reauth",
        }
    }
}

/// How the user identifies themselves at an identify step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identification {
    /// Email login ID.
    Email,
    /// Phone number login ID (E.164).
    Phone,
    /// Free-form username login ID.
    Username,
    /// Anonymous user, no login ID.
    Anonymous,
}

impl Identification {
    /// Stable string form used in error payloads and output data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Username => "username",
            Self::Anonymous => "anonymous",
        }
    }
}

/// An authentication method a branch may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMethod {
    /// First-factor password.
    PrimaryPassword,
    /// First-factor passkey (WebAuthn assertion).
    PrimaryPasskey,
    /// First-factor out-of-band OTP delivered to the email login ID.
    PrimaryOobOtpEmail,
    /// First-factor out-of-band OTP delivered to the phone login ID.
    PrimaryOobOtpSms,
    /// Second-factor password.
    SecondaryPassword,
    /// Second-factor TOTP.
    SecondaryTotp,
    /// Second-factor out-of-band OTP via email.
    SecondaryOobOtpEmail,
    /// Second-factor out-of-band OTP via SMS.
    SecondaryOobOtpSms,
    /// One-time recovery code.
    RecoveryCode,
}

impl AuthenticationMethod {
    /// Stable string form used in inputs, error payloads and output data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryPassword => "primary_password",
            Self::PrimaryPasskey => "primary_passkey",
            Self::PrimaryOobOtpEmail => "primary_oob_otp_email",
            Self::PrimaryOobOtpSms => "primary_oob_otp_sms",
            Self::SecondaryPassword => "secondary_password",
            Self::SecondaryTotp => "secondary_totp",
            Self::SecondaryOobOtpEmail => "secondary_oob_otp_email",
            Self::SecondaryOobOtpSms => "secondary_oob_otp_sms",
            Self::RecoveryCode => "recovery_code",
        }
    }

    /// The authenticator kind this method consumes, if it is backed by a
    /// stored authenticator. Recovery codes are not.
    #[must_use]
    pub const fn authenticator_kind(self) -> Option<AuthenticatorKind> {
        match self {
            Self::PrimaryPassword
            | Self::PrimaryPasskey
            | Self::PrimaryOobOtpEmail
            | Self::PrimaryOobOtpSms => Some(AuthenticatorKind::Primary),
            Self::SecondaryPassword
            | Self::SecondaryTotp
            | Self::SecondaryOobOtpEmail
            | Self::SecondaryOobOtpSms => Some(AuthenticatorKind::Secondary),
            Self::RecoveryCode => None,
        }
    }

    /// The authenticator type this method consumes, if any.
    #[must_use]
    pub const fn authenticator_type(self) -> Option<AuthenticatorType> {
        match self {
            Self::PrimaryPassword | Self::SecondaryPassword => Some(AuthenticatorType::Password),
            Self::PrimaryPasskey => Some(AuthenticatorType::Passkey),
            Self::PrimaryOobOtpEmail | Self::SecondaryOobOtpEmail => {
                Some(AuthenticatorType::OobOtpEmail)
            }
            Self::PrimaryOobOtpSms | Self::SecondaryOobOtpSms => Some(AuthenticatorType::OobOtpSms),
            Self::SecondaryTotp => Some(AuthenticatorType::Totp),
            Self::RecoveryCode => None,
        }
    }

    /// Whether this method counts as a second factor.
    #[must_use]
    pub const fn is_secondary(self) -> bool {
        matches!(
            self,
            Self::SecondaryPassword
                | Self::SecondaryTotp
                | Self::SecondaryOobOtpEmail
                | Self::SecondaryOobOtpSms
                | Self::RecoveryCode
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Flow definitions
// ═══════════════════════════════════════════════════════════════════════

/// One branch of an identify step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationBranch {
    /// The identification method this branch offers.
    pub identification: Identification,
    /// Steps executed after this branch is taken.
    #[serde(default)]
    pub steps: Vec<FlowStepConfig>,
}

/// One branch of an authenticate or create-authenticator step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationBranch {
    /// The authentication method this branch offers.
    pub authentication: AuthenticationMethod,
    /// Steps executed after this branch is taken.
    #[serde(default)]
    pub steps: Vec<FlowStepConfig>,
}

/// One step of a flow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowStepConfig {
    /// Select and establish the user's identity.
    Identify {
        /// Allowed identification methods, in configured order.
        one_of: Vec<IdentificationBranch>,
    },
    /// Verify one of the user's authenticators.
    Authenticate {
        /// Allowed authentication methods, in configured order.
        one_of: Vec<AuthenticationBranch>,
    },
    /// Verify the claim (email/phone) of the identity established earlier.
    /// Skipped when the identity carries no verifiable claim.
    Verify,
    /// Create a new authenticator for the user.
    CreateAuthenticator {
        /// Allowed authentication methods, in configured order.
        one_of: Vec<AuthenticationBranch>,
    },
}

/// A named flow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow name, surfaced in responses.
    pub name: String,
    /// Ordered steps.
    pub steps: Vec<FlowStepConfig>,
}

/// OTP delivery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Number of digits in a generated code.
    pub code_length: u8,
    /// Seconds a client must wait between resends.
    pub resend_cooldown_seconds: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { code_length: 6, resend_cooldown_seconds: 60 }
    }
}

/// Root tenant configuration consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowsConfig {
    /// Login flow definition.
    pub login: FlowConfig,
    /// Signup flow definition.
    pub signup: FlowConfig,
    /// Reauthentication flow definition.
    pub reauth: FlowConfig,
    /// Whether anonymous users may be used at identify steps.
    #[serde(default)]
    pub anonymous_users_enabled: bool,
    /// OTP delivery settings.
    #[serde(default)]
    pub otp: OtpConfig,
}

impl FlowsConfig {
    /// The flow definition for `flow_type`.
    #[must_use]
    pub const fn flow(&self, flow_type: FlowType) -> &FlowConfig {
        match flow_type {
            FlowType::Login => &self.login,
            FlowType::Signup => &self.signup,
            FlowType::Reauth => &self.reauth,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Flow pointers
// ═══════════════════════════════════════════════════════════════════════

/// One segment of a [`FlowPointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum PointerSegment {
    /// Index into a `steps` list.
    Steps(usize),
    /// Index into a `one_of` branch list.
    OneOf(usize),
}

/// A pointer locating a step within possibly-nested flow definitions.
///
/// Displayed in the JSON-pointer style used by clients, e.g.
/// `/steps/0/one_of/1/steps/0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPointer(Vec<PointerSegment>);

impl FlowPointer {
    /// Pointer to the root of a flow definition.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Extend with a `steps` index.
    #[must_use]
    pub fn step(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PointerSegment::Steps(index));
        Self(segments)
    }

    /// Extend with a `one_of` branch index.
    #[must_use]
    pub fn one_of(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PointerSegment::OneOf(index));
        Self(segments)
    }

    /// The segments of this pointer.
    #[must_use]
    pub fn segments(&self) -> &[PointerSegment] {
        &self.0
    }

    /// Resolve this pointer to a step within `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::MalformedState`] when the pointer does not
    /// address a step in the definition, which indicates config/state skew.
    pub fn resolve<'a>(&self, config: &'a FlowConfig) -> Result<&'a FlowStepConfig> {
        let mut steps = &config.steps;
        let mut current: Option<&FlowStepConfig> = None;
        let mut segments = self.0.iter().peekable();

        while let Some(segment) = segments.next() {
            match *segment {
                PointerSegment::Steps(i) => {
                    current = Some(steps.get(i).ok_or_else(|| self.dangling())?);
                }
                PointerSegment::OneOf(i) => {
                    let step = current.ok_or_else(|| self.dangling())?;
                    steps = match step {
                        FlowStepConfig::Identify { one_of } => {
                            &one_of.get(i).ok_or_else(|| self.dangling())?.steps
                        }
                        FlowStepConfig::Authenticate { one_of }
                        | FlowStepConfig::CreateAuthenticator { one_of } => {
                            &one_of.get(i).ok_or_else(|| self.dangling())?.steps
                        }
                        FlowStepConfig::Verify => return Err(self.dangling()),
                    };
                    current = None;
                    // A pointer may legitimately end on a branch; the next
                    // segment (if any) must then index into its steps.
                    if segments.peek().is_none() {
                        return Err(self.dangling());
                    }
                }
            }
        }

        current.ok_or_else(|| self.dangling())
    }

    /// The steps nested under the branch this pointer addresses.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::MalformedState`] when the pointer does not
    /// address a branching step or the branch index is out of range.
    pub fn resolve_branch_steps<'a>(
        &self,
        config: &'a FlowConfig,
        branch_index: usize,
    ) -> Result<&'a [FlowStepConfig]> {
        match self.resolve(config)? {
            FlowStepConfig::Identify { one_of } => one_of
                .get(branch_index)
                .map(|b| b.steps.as_slice())
                .ok_or_else(|| self.dangling()),
            FlowStepConfig::Authenticate { one_of }
            | FlowStepConfig::CreateAuthenticator { one_of } => one_of
                .get(branch_index)
                .map(|b| b.steps.as_slice())
                .ok_or_else(|| self.dangling()),
            FlowStepConfig::Verify => Err(self.dangling()),
        }
    }

    fn dangling(&self) -> FlowError {
        FlowError::MalformedState { reason: format!("flow pointer {self} does not address a step") }
    }
}

impl fmt::Display for FlowPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            match segment {
                PointerSegment::Steps(i) => write!(f, "/steps/{i}")?,
                PointerSegment::OneOf(i) => write!(f, "/one_of/{i}")?,
            }
        }
        Ok(())
    }
}
