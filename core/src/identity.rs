//! Identity models.

use crate::ids::{IdentityId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The category of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
    /// A login-ID identity (email, phone or username).
    LoginId,
    /// An anonymous identity with no login ID.
    Anonymous,
}

/// The login-ID claim type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginIdType {
    /// Email address.
    Email,
    /// E.164 phone number.
    Phone,
    /// Free-form username.
    Username,
}

impl LoginIdType {
    /// Whether this login ID carries an out-of-band-verifiable claim.
    #[must_use]
    pub const fn is_verifiable(self) -> bool {
        matches!(self, Self::Email | Self::Phone)
    }
}

/// A login-ID claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginIdSpec {
    /// Claim type.
    pub r#type: LoginIdType,
    /// Claim value (normalized).
    pub value: String,
}

/// A stored identity, as listed by the identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityInfo {
    /// Identity ID.
    pub id: IdentityId,
    /// Owning user.
    pub user_id: UserId,
    /// Category.
    pub r#type: IdentityType,
    /// Login-ID claim. `None` for anonymous identities.
    pub login_id: Option<LoginIdSpec>,
    /// Whether the login-ID claim has been verified out of band.
    pub claim_verified: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl IdentityInfo {
    /// Construct a new login-ID identity for `user_id`.
    #[must_use]
    pub fn new_login_id(user_id: UserId, r#type: LoginIdType, value: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(),
            user_id,
            r#type: IdentityType::LoginId,
            login_id: Some(LoginIdSpec { r#type, value: value.into() }),
            claim_verified: false,
            created_at: Utc::now(),
        }
    }

    /// Construct a new anonymous identity for `user_id`.
    #[must_use]
    pub fn new_anonymous(user_id: UserId) -> Self {
        Self {
            id: IdentityId::new(),
            user_id,
            r#type: IdentityType::Anonymous,
            login_id: None,
            claim_verified: false,
            created_at: Utc::now(),
        }
    }

    /// The login-ID claim type, if any.
    #[must_use]
    pub fn login_id_type(&self) -> Option<LoginIdType> {
        self.login_id.as_ref().map(|spec| spec.r#type)
    }

    /// The login-ID claim value, if any.
    #[must_use]
    pub fn login_id_value(&self) -> Option<&str> {
        self.login_id.as_ref().map(|spec| spec.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifiable_claims() {
        assert!(LoginIdType::Email.is_verifiable());
        assert!(LoginIdType::Phone.is_verifiable());
        assert!(!LoginIdType::Username.is_verifiable());
    }

    #[test]
    fn anonymous_has_no_login_id() {
        let identity = IdentityInfo::new_anonymous(UserId::new());
        assert_eq!(identity.r#type, IdentityType::Anonymous);
        assert!(identity.login_id_value().is_none());
    }
}
