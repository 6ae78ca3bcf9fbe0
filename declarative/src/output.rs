//! Presentation data exposed by waiting steps.
//!
//! These are pure projections: constructing them reads stores but never
//! writes, so rendering the same step twice is always safe.

use authflow_core::config::{AuthenticationMethod, Identification};
use authflow_core::deps::OtpChannel;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One selectable authentication option at an authenticate step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationOption {
    /// The method this option selects.
    pub authentication: AuthenticationMethod,
    /// Masked delivery target, for OOB-OTP options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_display_name: Option<String>,
}

/// Data shown at an identify step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentificationData {
    /// Allowed identification methods, in configured order.
    pub options: Vec<Identification>,
}

/// Data shown at an authenticate step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationData {
    /// Usable options, in configured order.
    pub options: Vec<AuthenticationOption>,
}

/// Data shown at a create-authenticator step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAuthenticatorData {
    /// Methods the client may create an authenticator for.
    pub options: Vec<AuthenticationMethod>,
}

/// Data shown while a step waits on an out-of-band OTP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpData {
    /// Delivery channel.
    pub channel: OtpChannel,
    /// Masked delivery target.
    pub masked_claim_value: String,
    /// Number of digits the client should collect.
    pub code_length: u8,
    /// Earliest time a resend will be accepted.
    pub can_resend_at: DateTime<Utc>,
    /// Whether verification attempts are currently throttled.
    pub failed_attempt_rate_limit_exceeded: bool,
}
