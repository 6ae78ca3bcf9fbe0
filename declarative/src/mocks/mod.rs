//! Mock collaborator implementations for testing.
//!
//! In-memory, deterministic versions of every trait in
//! `authflow_core::deps`, with call counters where tests assert on
//! interaction (lockout bookkeeping, OTP delivery). Whole flows run
//! against these at memory speed.

mod authenticator;
mod clock;
mod events;
mod identity;
mod lockout;
mod otp;
mod passkey;
mod recovery_code;
mod session;
mod user;

pub use authenticator::MemoryAuthenticatorStore;
pub use clock::FixedClock;
pub use events::MockEventSink;
pub use identity::MemoryIdentityStore;
pub use lockout::MockLockoutService;
pub use otp::MockOtpService;
pub use passkey::MockPasskeyService;
pub use recovery_code::MockRecoveryCodeStore;
pub use session::MockSessionService;
pub use user::MemoryUserStore;

use std::sync::{Arc, Mutex, MutexGuard};

use authflow_core::config::FlowsConfig;
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| FlowError::Internal("mock state lock poisoned".into()))
}

/// Every mock backing a [`Dependencies`] container, kept around for
/// assertions after the flow ran.
#[derive(Clone)]
pub struct TestContext {
    /// The container handed to the engine.
    pub deps: Dependencies,
    /// Identity store.
    pub identities: Arc<MemoryIdentityStore>,
    /// User store.
    pub users: Arc<MemoryUserStore>,
    /// Authenticator store.
    pub authenticators: Arc<MemoryAuthenticatorStore>,
    /// OTP service.
    pub otp: Arc<MockOtpService>,
    /// Lockout service.
    pub lockout: Arc<MockLockoutService>,
    /// Session service.
    pub sessions: Arc<MockSessionService>,
    /// Event sink.
    pub events: Arc<MockEventSink>,
    /// Passkey service.
    pub passkeys: Arc<MockPasskeyService>,
    /// Recovery code store.
    pub recovery_codes: Arc<MockRecoveryCodeStore>,
    /// Clock.
    pub clock: Arc<FixedClock>,
}

impl TestContext {
    /// A fresh context over empty mocks.
    #[must_use]
    pub fn new(config: FlowsConfig) -> Self {
        let identities = Arc::new(MemoryIdentityStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let authenticators = Arc::new(MemoryAuthenticatorStore::new());
        let otp = Arc::new(MockOtpService::new());
        let lockout = Arc::new(MockLockoutService::new());
        let sessions = Arc::new(MockSessionService::new());
        let events = Arc::new(MockEventSink::new());
        let passkeys = Arc::new(MockPasskeyService::new());
        let recovery_codes = Arc::new(MockRecoveryCodeStore::new());
        let clock = Arc::new(FixedClock::new());

        let deps = Dependencies::new(
            Arc::new(config),
            Arc::clone(&identities) as _,
            Arc::clone(&users) as _,
            Arc::clone(&authenticators) as _,
            Arc::clone(&otp) as _,
            Arc::clone(&lockout) as _,
            Arc::clone(&sessions) as _,
            Arc::clone(&events) as _,
            Arc::clone(&passkeys) as _,
            Arc::clone(&recovery_codes) as _,
            Arc::clone(&clock) as _,
        );

        Self {
            deps,
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
