//! Session models and Authentication Method Reference values.

use crate::config::FlowType;
use crate::ids::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authentication Method Reference (RFC 8176 plus local extensions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amr {
    /// Password.
    Pwd,
    /// One-time password.
    Otp,
    /// SMS delivery.
    Sms,
    /// Hardware-backed key (passkey).
    #[serde(rename = "hwk")]
    HwK,
    /// Multi-factor authentication.
    Mfa,
    /// Recovery code (local extension).
    #[serde(rename = "x_recovery_code")]
    RecoveryCode,
}

impl Amr {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pwd => "pwd",
            Self::Otp => "otp",
            Self::Sms => "sms",
            Self::HwK => "hwk",
            Self::Mfa => "mfa",
            Self::RecoveryCode => "x_recovery_code",
        }
    }
}

/// Attributes a session is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAttrs {
    /// The authenticated user.
    pub user_id: UserId,
    /// AMR values collected from the flow, sorted and deduplicated.
    pub amr: Vec<Amr>,
    /// Which flow issued the session.
    pub flow_type: FlowType,
}

/// An issued session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// The authenticated user.
    pub user_id: UserId,
    /// AMR values.
    pub amr: Vec<Amr>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}
