//! Error types for the flow engine.

use thiserror::Error;

/// Result type alias for flow engine operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Error taxonomy for the flow engine.
///
/// Variants fall into five categories that callers treat differently:
///
/// - **Terminal signal**: [`FlowError::Eof`] — the flow has nothing left to
///   react to and must be finalized. Not a failure.
/// - **Client/input errors**: [`FlowError::IncompatibleInput`] — the input
///   did not match the shape the current step expects. Flow position is
///   unchanged and the caller may retry with a corrected payload.
/// - **Credential/domain errors**: wrong password, disallowed method,
///   wrong OTP code. Flow position is unchanged; retries are counted by
///   the external lockout/rate-limit services.
/// - **Policy violations**: fatal for this flow path; the caller must
///   restart the flow.
/// - **Structural errors**: unknown kinds, malformed snapshots, store
///   failures — deploy skew or storage corruption, never retryable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    // ═══════════════════════════════════════════════════════════
    // Terminal signal
    // ═══════════════════════════════════════════════════════════
    /// The flow has no further input to accept and must be finalized.
    #[error("end of flow")]
    Eof,

    // ═══════════════════════════════════════════════════════════
    // Client/input errors
    // ═══════════════════════════════════════════════════════════
    /// The input does not match the shape the current step expects.
    #[error("input is incompatible with the current step")]
    IncompatibleInput,

    // ═══════════════════════════════════════════════════════════
    // Credential/domain errors
    // ═══════════════════════════════════════════════════════════
    /// The supplied credential failed verification.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The selected authentication method is not usable at this step.
    #[error("invalid authentication method: {actual} (allowed: {allowed:?})")]
    InvalidAuthenticationMethod {
        /// Methods the user may actually use at this step, in configured order.
        allowed: Vec<String>,
        /// The rejected method.
        actual: String,
    },

    /// The supplied OTP code is wrong or expired.
    #[error("invalid OTP code")]
    InvalidOtpCode,

    /// Too many attempts against the OTP target.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// The account is temporarily locked after repeated failures.
    #[error("account locked")]
    AccountLocked,

    /// No user matches the supplied login ID.
    #[error("user not found")]
    UserNotFound,

    /// An identity with the same login ID already exists.
    #[error("identity already exists")]
    DuplicatedIdentity,

    // ═══════════════════════════════════════════════════════════
    // Policy violations
    // ═══════════════════════════════════════════════════════════
    /// The user has no usable authenticator for any configured branch.
    #[error("no usable authentication method")]
    NoUsableAuthenticationMethod,

    /// Tenant configuration forbids this flow path.
    #[error("configuration violated: {reason}")]
    ConfigurationViolated {
        /// Which configuration rule was violated.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Structural errors
    // ═══════════════════════════════════════════════════════════
    /// A persisted kind string has no registered constructor.
    #[error("unknown kind: {kind}")]
    UnknownKind {
        /// The unrecognized kind discriminator.
        kind: String,
    },

    /// A persisted snapshot could not be decoded into a flow.
    #[error("malformed flow state: {reason}")]
    MalformedState {
        /// What was wrong with the snapshot.
        reason: String,
    },

    /// No flow is stored under the requested ID.
    #[error("flow not found")]
    FlowNotFound,

    /// Optimistic concurrency check failed on save.
    #[error("flow revision conflict")]
    RevisionConflict,

    /// The flow store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Invariant violation inside the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Returns `true` if this error is due to user input and the flow can
    /// be retried from the same position.
    ///
    /// # Examples
    ///
    /// ```
    /// # use authflow_core::FlowError;
    /// assert!(FlowError::InvalidCredentials.is_user_error());
    /// assert!(!FlowError::FlowNotFound.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleInput
                | Self::InvalidCredentials
                | Self::InvalidAuthenticationMethod { .. }
                | Self::InvalidOtpCode
                | Self::RateLimitExceeded
                | Self::UserNotFound
                | Self::DuplicatedIdentity
        )
    }

    /// Returns `true` if this error is fatal for the flow instance and the
    /// caller must start over.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoUsableAuthenticationMethod
                | Self::ConfigurationViolated { .. }
                | Self::UnknownKind { .. }
                | Self::MalformedState { .. }
                | Self::FlowNotFound
                | Self::Store(_)
                | Self::Internal(_)
        )
    }

    /// Returns `true` if this is the terminal signal rather than a failure.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}


impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedState { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_are_not_fatal() {
        let err = FlowError::InvalidAuthenticationMethod {
            allowed: vec!["primary_password".into()],
            actual: "primary_oob_otp_email".into(),
        };
        assert!(err.is_user_error());
        assert!(!err.is_fatal());
        assert!(!err.is_eof());
    }

    #[test]
    fn eof_is_neither_user_error_nor_fatal() {
        assert!(FlowError::Eof.is_eof());
        assert!(!FlowError::Eof.is_user_error());
        assert!(!FlowError::Eof.is_fatal());
    }

    #[test]
    fn corruption_is_fatal() {
        let err = FlowError::UnknownKind { kind: "NodeGone".into() };
        assert!(err.is_fatal());
        assert!(!err.is_user_error());
    }
}
