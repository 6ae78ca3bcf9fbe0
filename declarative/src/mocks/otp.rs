//! Mock OTP service with delivery recording.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::deps::{OtpChannel, OtpForm, OtpPurpose, OtpService, OtpState};
use authflow_core::error::{FlowError, Result};
use chrono::{Duration, Utc};

use super::lock;

/// One delivered code, recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentOtp {
    /// Delivery channel.
    pub channel: OtpChannel,
    /// Delivery target.
    pub target: String,
    /// Why the code was sent.
    pub purpose: OtpPurpose,
    /// The generated code.
    pub code: String,
}

/// In-memory OTP service. Codes are sequential (`000001`, `000002`, …)
/// and every delivery is recorded.
#[derive(Debug, Default)]
pub struct MockOtpService {
    sent: Mutex<Vec<SentOtp>>,
    active: Mutex<HashMap<(String, OtpPurpose), String>>,
    next: Mutex<u32>,
    rate_limited: Mutex<bool>,
    failed_verifies: Mutex<u32>,
}

impl MockOtpService {
    /// A service with no codes outstanding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every subsequent `generate`/`verify` to fail with
    /// [`FlowError::RateLimitExceeded`].
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn set_rate_limited(&self, limited: bool) {
        *self.rate_limited.lock().unwrap() = limited;
    }

    /// Every delivery so far, in order.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn sent(&self) -> Vec<SentOtp> {
        self.sent.lock().unwrap().clone()
    }

    /// The code most recently delivered to `target` for `purpose`.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn last_code(&self, target: &str, purpose: OtpPurpose) -> Option<String> {
        self.active.lock().unwrap().get(&(target.to_string(), purpose)).cloned()
    }

    /// How many verifications failed so far.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn failed_verifies(&self) -> u32 {
        *self.failed_verifies.lock().unwrap()
    }
}

#[async_trait]
impl OtpService for MockOtpService {
    async fn generate(
        &self,
        channel: OtpChannel,
        target: &str,
        purpose: OtpPurpose,
        _form: OtpForm,
    ) -> Result<String> {
        if *lock(&self.rate_limited)? {
            return Err(FlowError::RateLimitExceeded);
        }
        let mut next = lock(&self.next)?;
        *next += 1;
        let code = format!("{next:06}");
        drop(next);

        lock(&self.active)?.insert((target.to_string(), purpose), code.clone());
        lock(&self.sent)?.push(SentOtp {
            channel,
            target: target.to_string(),
            purpose,
            code: code.clone(),
        });
        Ok(code)
    }

    async fn verify(
        &self,
        _channel: OtpChannel,
        target: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<()> {
        if *lock(&self.rate_limited)? {
            return Err(FlowError::RateLimitExceeded);
        }
        let active = lock(&self.active)?;
        let matches = active
            .get(&(target.to_string(), purpose))
            .is_some_and(|expected| expected == code);
        drop(active);
        if matches {
            Ok(())
        } else {
            *lock(&self.failed_verifies)? += 1;
            Err(FlowError::InvalidOtpCode)
        }
    }

    async fn inspect_state(
        &self,
        _channel: OtpChannel,
        _target: &str,
        _purpose: OtpPurpose,
    ) -> Result<OtpState> {
        Ok(OtpState {
            can_resend_at: Utc::now() + Duration::seconds(60),
            failed_attempt_rate_limit_exceeded: *lock(&self.rate_limited)?,
        })
    }
}
