//! Mock lockout service with interaction counters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::authenticator::LockoutMethod;
use authflow_core::deps::LockoutService;
use authflow_core::error::{FlowError, Result};
use authflow_core::ids::UserId;

use super::lock;

/// In-memory lockout bookkeeping. Locks the user out once the failed
/// attempt count for any method reaches the configured threshold.
#[derive(Debug)]
pub struct MockLockoutService {
    failed: Mutex<HashMap<(UserId, LockoutMethod), u32>>,
    threshold: Mutex<Option<u32>>,
    check_calls: Mutex<u32>,
    record_calls: Mutex<u32>,
    clear_calls: Mutex<u32>,
}

impl Default for MockLockoutService {
    fn default() -> Self {
        Self {
            failed: Mutex::new(HashMap::new()),
            threshold: Mutex::new(None),
            check_calls: Mutex::new(0),
            record_calls: Mutex::new(0),
            clear_calls: Mutex::new(0),
        }
    }
}

impl MockLockoutService {
    /// A service that never locks anyone out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock out after `attempts` failures of any one method.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn set_threshold(&self, attempts: u32) {
        *self.threshold.lock().unwrap() = Some(attempts);
    }

    /// Recorded failures for one user/method pair.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn failed_attempts(&self, user_id: UserId, method: LockoutMethod) -> u32 {
        self.failed.lock().unwrap().get(&(user_id, method)).copied().unwrap_or(0)
    }

    /// How many times `check` ran.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn check_calls(&self) -> u32 {
        *self.check_calls.lock().unwrap()
    }

    /// How many times `record_failed_attempt` ran.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn record_calls(&self) -> u32 {
        *self.record_calls.lock().unwrap()
    }

    /// How many times `clear_failed_attempts` ran.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn clear_calls(&self) -> u32 {
        *self.clear_calls.lock().unwrap()
    }
}

#[async_trait]
impl LockoutService for MockLockoutService {
    async fn check(&self, user_id: UserId, method: LockoutMethod) -> Result<()> {
        *lock(&self.check_calls)? += 1;
        let threshold = *lock(&self.threshold)?;
        if let Some(threshold) = threshold {
            let failed = lock(&self.failed)?.get(&(user_id, method)).copied().unwrap_or(0);
            if failed >= threshold {
                return Err(FlowError::AccountLocked);
            }
        }
        Ok(())
    }

    async fn record_failed_attempt(&self, user_id: UserId, method: LockoutMethod) -> Result<()> {
        *lock(&self.record_calls)? += 1;
        *lock(&self.failed)?.entry((user_id, method)).or_insert(0) += 1;
        Ok(())
    }

    async fn clear_failed_attempts(&self, user_id: UserId) -> Result<()> {
        *lock(&self.clear_calls)? += 1;
        lock(&self.failed)?.retain(|(locked_user, _), _| *locked_user != user_id);
        Ok(())
    }
}
