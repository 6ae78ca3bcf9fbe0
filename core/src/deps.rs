//! Collaborator contracts and the engine's dependency container.
//!
//! Every external system the engine touches sits behind one of these
//! traits. Nodes and intents receive a [`Dependencies`] reference and
//! never perform I/O any other way, which keeps flow logic testable with
//! in-memory collaborators.
//!
//! All calls are synchronous from the engine's point of view: the engine
//! awaits them inline and owns no background tasks. Rate-limit
//! bookkeeping and OTP expiry belong to the services behind
//! [`OtpService`] and [`LockoutService`].

use crate::authenticator::{
    AuthenticatorFilter, AuthenticatorInfo, AuthenticatorKind, AuthenticatorSpec,
    AuthenticatorType, LockoutMethod, VerifyResult,
};
use crate::config::FlowsConfig;
use crate::error::Result;
use crate::event::FlowEvent;
use crate::identity::{IdentityInfo, LoginIdType};
use crate::ids::{IdentityId, UserId};
use crate::session::{Session, SessionAttrs};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read/write access to stored identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up the identity carrying the given login-ID claim.
    async fn get_by_login_id(
        &self,
        r#type: LoginIdType,
        value: &str,
    ) -> Result<Option<IdentityInfo>>;

    /// Persist a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::DuplicatedIdentity`] when an identity
    /// with the same login ID already exists.
    async fn create(&self, identity: &IdentityInfo) -> Result<()>;

    /// Record that the identity's login-ID claim has been verified.
    async fn mark_claim_verified(&self, identity_id: IdentityId) -> Result<()>;
}

/// Minimal user record store; the engine only ever creates users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user record.
    async fn create(&self, user_id: UserId) -> Result<()>;
}

/// Read/verify/write access to stored authenticators.
#[async_trait]
pub trait AuthenticatorStore: Send + Sync {
    /// List the user's authenticators, keeping only those passing all
    /// `filters`.
    async fn list(
        &self,
        user_id: UserId,
        filters: &[&dyn AuthenticatorFilter],
    ) -> Result<Vec<AuthenticatorInfo>>;

    /// Verify `spec` against one of `candidates`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::InvalidCredentials`] when no candidate
    /// matches the spec.
    async fn verify_with_spec(
        &self,
        user_id: UserId,
        r#type: AuthenticatorType,
        candidates: &[AuthenticatorInfo],
        spec: &AuthenticatorSpec,
    ) -> Result<VerifyResult>;

    /// Build a new authenticator from `spec` (hashing secret material as
    /// needed) without persisting it. Persistence happens at commit via
    /// [`AuthenticatorStore::create`].
    async fn new_from_spec(
        &self,
        user_id: UserId,
        kind: AuthenticatorKind,
        r#type: AuthenticatorType,
        spec: &AuthenticatorSpec,
        is_default: bool,
    ) -> Result<AuthenticatorInfo>;

    /// Persist an authenticator built by
    /// [`AuthenticatorStore::new_from_spec`].
    async fn create(&self, info: &AuthenticatorInfo) -> Result<()>;
}

/// Delivery channel for out-of-band OTP codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpChannel {
    /// Email delivery.
    Email,
    /// SMS delivery.
    Sms,
    /// WhatsApp delivery.
    Whatsapp,
}

/// Why an OTP is being sent; kept separate so codes cannot be replayed
/// across purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    /// Authenticate an existing authenticator.
    Authenticate,
    /// Verify a newly claimed email/phone.
    VerifyClaim,
}

/// The shape of the delivered secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpForm {
    /// Numeric code typed back by the user.
    Code,
    /// Clickable link carrying the code.
    Link,
}

/// Read-only view of an OTP target's throttling state.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpState {
    /// Earliest time another code may be sent to this target.
    pub can_resend_at: DateTime<Utc>,
    /// Whether verification attempts are currently rate-limited.
    pub failed_attempt_rate_limit_exceeded: bool,
}

/// OTP generation, delivery and verification.
///
/// The service owns code storage, expiry and per-target rate limits.
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Generate a fresh code, deliver it out of band, and return it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::RateLimitExceeded`] when the target's
    /// resend cooldown has not elapsed.
    async fn generate(
        &self,
        channel: OtpChannel,
        target: &str,
        purpose: OtpPurpose,
        form: OtpForm,
    ) -> Result<String>;

    /// Verify a submitted code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::InvalidOtpCode`] on mismatch/expiry and
    /// [`crate::FlowError::RateLimitExceeded`] when attempts are throttled.
    async fn verify(
        &self,
        channel: OtpChannel,
        target: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<()>;

    /// Inspect the target's throttling state without side effects.
    async fn inspect_state(
        &self,
        channel: OtpChannel,
        target: &str,
        purpose: OtpPurpose,
    ) -> Result<OtpState>;
}

/// Failed-attempt lockout bookkeeping, consulted synchronously around
/// every credential verification.
#[async_trait]
pub trait LockoutService: Send + Sync {
    /// Fail with [`crate::FlowError::AccountLocked`] when the user is
    /// currently locked out for `method`.
    async fn check(&self, user_id: UserId, method: LockoutMethod) -> Result<()>;

    /// Record one failed attempt for `method`.
    async fn record_failed_attempt(&self, user_id: UserId, method: LockoutMethod) -> Result<()>;

    /// Clear the user's failed attempts after a successful verification.
    async fn clear_failed_attempts(&self, user_id: UserId) -> Result<()>;
}

/// Session issuance. Invoked only from the effect commit pass.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create a session with the given attributes.
    async fn create(&self, attrs: &SessionAttrs) -> Result<Session>;
}

/// Audit/webhook event dispatch. Invoked only from the effect commit pass.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Dispatch one event.
    async fn dispatch(&self, event: &FlowEvent) -> Result<()>;
}

/// WebAuthn assertion verification.
#[async_trait]
pub trait PasskeyService: Send + Sync {
    /// Verify an assertion and return the passkey authenticator it proves
    /// possession of.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::InvalidCredentials`] when the assertion
    /// does not verify.
    async fn verify_assertion(
        &self,
        user_id: UserId,
        assertion: &serde_json::Value,
    ) -> Result<AuthenticatorInfo>;
}

/// One-time recovery code consumption.
#[async_trait]
pub trait RecoveryCodeStore: Send + Sync {
    /// Atomically consume a recovery code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FlowError::InvalidCredentials`] when the code is
    /// unknown or already used.
    async fn consume(&self, user_id: UserId, code: &str) -> Result<()>;
}

/// Clock abstraction for testability.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything a node or intent may touch while reacting.
#[derive(Clone)]
pub struct Dependencies {
    /// Tenant flow configuration.
    pub config: Arc<FlowsConfig>,
    /// Identity store.
    pub identities: Arc<dyn IdentityStore>,
    /// User store.
    pub users: Arc<dyn UserStore>,
    /// Authenticator store.
    pub authenticators: Arc<dyn AuthenticatorStore>,
    /// OTP service.
    pub otp: Arc<dyn OtpService>,
    /// Lockout service.
    pub lockout: Arc<dyn LockoutService>,
    /// Session service.
    pub sessions: Arc<dyn SessionService>,
    /// Event sink.
    pub events: Arc<dyn EventSink>,
    /// Passkey service.
    pub passkeys: Arc<dyn PasskeyService>,
    /// Recovery code store.
    pub recovery_codes: Arc<dyn RecoveryCodeStore>,
    /// Clock.
    pub clock: Arc<dyn Clock>,
}

impl Dependencies {
    /// Create a new dependency container.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<FlowsConfig>,
        identities: Arc<dyn IdentityStore>,
        users: Arc<dyn UserStore>,
        authenticators: Arc<dyn AuthenticatorStore>,
        otp: Arc<dyn OtpService>,
        lockout: Arc<dyn LockoutService>,
        sessions: Arc<dyn SessionService>,
        events: Arc<dyn EventSink>,
        passkeys: Arc<dyn PasskeyService>,
        recovery_codes: Arc<dyn RecoveryCodeStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            identities,
            users,
            authenticators,
            otp,
            lockout,
            sessions,
            events,
            passkeys,
            recovery_codes,
            clock,
        }
    }
}
