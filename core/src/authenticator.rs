//! Authenticator models and composable list filters.

use crate::ids::{AuthenticatorId, UserId};
use crate::identity::{IdentityInfo, LoginIdType};
use crate::session::Amr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an authenticator is a first or second factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticatorKind {
    /// First factor.
    Primary,
    /// Second factor.
    Secondary,
}

/// The concrete authenticator mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticatorType {
    /// Memorized password.
    Password,
    /// WebAuthn passkey.
    Passkey,
    /// Time-based OTP.
    Totp,
    /// Out-of-band OTP delivered by email.
    OobOtpEmail,
    /// Out-of-band OTP delivered by SMS (or WhatsApp).
    OobOtpSms,
}

/// The failed-attempt throttling policy an authenticator type falls under.
///
/// Passkeys are phishing-resistant and exempt from lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutMethod {
    /// Password attempts.
    Password,
    /// TOTP attempts.
    Totp,
    /// Out-of-band OTP attempts.
    OobOtp,
    /// Recovery code attempts.
    RecoveryCode,
}

impl AuthenticatorType {
    /// The lockout method attempts against this type count toward, if any.
    #[must_use]
    pub const fn lockout_method(self) -> Option<LockoutMethod> {
        match self {
            Self::Password => Some(LockoutMethod::Password),
            Self::Totp => Some(LockoutMethod::Totp),
            Self::OobOtpEmail | Self::OobOtpSms => Some(LockoutMethod::OobOtp),
            Self::Passkey => None,
        }
    }
}

/// A stored authenticator, as listed by the authenticator store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatorInfo {
    /// Authenticator ID.
    pub id: AuthenticatorId,
    /// Owning user.
    pub user_id: UserId,
    /// First or second factor.
    pub kind: AuthenticatorKind,
    /// Mechanism.
    pub r#type: AuthenticatorType,
    /// Whether this is the user's default authenticator of its kind.
    pub is_default: bool,
    /// Delivery target for OOB-OTP authenticators (email address or
    /// E.164 phone number). `None` for other types.
    pub oob_target: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl AuthenticatorInfo {
    /// Authentication Method Reference values asserted by a successful
    /// verification with this authenticator.
    #[must_use]
    pub fn amr(&self) -> Vec<Amr> {
        match self.r#type {
            AuthenticatorType::Password => vec![Amr::Pwd],
            AuthenticatorType::Passkey => vec![Amr::HwK],
            AuthenticatorType::Totp => vec![Amr::Otp],
            AuthenticatorType::OobOtpEmail => vec![Amr::Otp],
            AuthenticatorType::OobOtpSms => vec![Amr::Otp, Amr::Sms],
        }
    }
}

/// Secret material submitted for verification or creation.
///
/// Specs are short-lived inputs; they are never persisted in flow state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticatorSpec {
    /// Plaintext password (hashed by the store).
    Password {
        /// The plaintext password.
        plain_password: String,
    },
    /// TOTP code.
    Totp {
        /// The submitted code.
        code: String,
    },
    /// OOB-OTP delivery target.
    OobOtp {
        /// Email address or E.164 phone number.
        target: String,
    },
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResult {
    /// The authenticator that verified the spec.
    pub authenticator: AuthenticatorInfo,
    /// Whether the stored secret should be re-hashed/updated.
    pub requires_update: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// Filters
// ═══════════════════════════════════════════════════════════════════════

/// A composable predicate over stored authenticators.
pub trait AuthenticatorFilter: Send + Sync {
    /// Whether `info` passes this filter.
    fn keep(&self, info: &AuthenticatorInfo) -> bool;
}

impl<F> AuthenticatorFilter for F
where
    F: Fn(&AuthenticatorInfo) -> bool + Send + Sync,
{
    fn keep(&self, info: &AuthenticatorInfo) -> bool {
        self(info)
    }
}

/// Keep authenticators of the given kind.
#[must_use]
pub fn keep_kind(kind: AuthenticatorKind) -> impl AuthenticatorFilter {
    move |info: &AuthenticatorInfo| info.kind == kind
}

/// Keep authenticators of the given type.
#[must_use]
pub fn keep_type(r#type: AuthenticatorType) -> impl AuthenticatorFilter {
    move |info: &AuthenticatorInfo| info.r#type == r#type
}

/// Keep the user's default authenticators.
#[must_use]
pub fn keep_default() -> impl AuthenticatorFilter {
    |info: &AuthenticatorInfo| info.is_default
}

/// Keep authenticators that can serve the given identity.
///
/// For OOB-OTP this requires the stored delivery target to equal the
/// identity's login-ID claim; other types always match.
#[must_use]
pub fn keep_matching_identity(identity: &IdentityInfo) -> impl AuthenticatorFilter + '_ {
    move |info: &AuthenticatorInfo| match info.r#type {
        AuthenticatorType::OobOtpEmail => {
            matches!(identity.login_id_type(), Some(LoginIdType::Email))
                && info.oob_target.as_deref() == identity.login_id_value()
        }
        AuthenticatorType::OobOtpSms => {
            matches!(identity.login_id_type(), Some(LoginIdType::Phone))
                && info.oob_target.as_deref() == identity.login_id_value()
        }
        _ => true,
    }
}

/// Apply `filters` to `infos`, keeping only entries that pass all of them.
#[must_use]
pub fn apply_filters(
    mut infos: Vec<AuthenticatorInfo>,
    filters: &[&dyn AuthenticatorFilter],
) -> Vec<AuthenticatorInfo> {
    infos.retain(|info| filters.iter().all(|f| f.keep(info)));
    infos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityInfo, IdentityType, LoginIdSpec};
    use crate::ids::IdentityId;

    fn password(user_id: UserId) -> AuthenticatorInfo {
        AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind: AuthenticatorKind::Primary,
            r#type: AuthenticatorType::Password,
            is_default: true,
            oob_target: None,
            created_at: Utc::now(),
        }
    }

    fn oob_email(user_id: UserId, target: &str) -> AuthenticatorInfo {
        AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind: AuthenticatorKind::Primary,
            r#type: AuthenticatorType::OobOtpEmail,
            is_default: false,
            oob_target: Some(target.into()),
            created_at: Utc::now(),
        }
    }

    fn email_identity(user_id: UserId, value: &str) -> IdentityInfo {
        IdentityInfo {
            id: IdentityId::new(),
            user_id,
            r#type: IdentityType::LoginId,
            login_id: Some(LoginIdSpec { r#type: LoginIdType::Email, value: value.into() }),
            claim_verified: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filters_compose() {
        let user_id = UserId::new();
        let infos = vec![password(user_id), oob_email(user_id, "a@example.com")];
        let kind = keep_kind(AuthenticatorKind::Primary);
        let r#type = keep_type(AuthenticatorType::Password);
        let kept = apply_filters(infos, &[&kind, &r#type]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].r#type, AuthenticatorType::Password);
    }

    #[test]
    fn oob_filter_requires_matching_claim() {
        let user_id = UserId::new();
        let identity = email_identity(user_id, "a@example.com");
        let infos =
            vec![oob_email(user_id, "a@example.com"), oob_email(user_id, "other@example.com")];
        let filter = keep_matching_identity(&identity);
        let kept = apply_filters(infos, &[&filter]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].oob_target.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn sms_amr_includes_sms() {
        let user_id = UserId::new();
        let mut info = oob_email(user_id, "+85298765432");
        info.r#type = AuthenticatorType::OobOtpSms;
        assert_eq!(info.amr(), vec![Amr::Otp, Amr::Sms]);
    }
}
