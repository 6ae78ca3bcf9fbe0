//! Controllable test clock.

use std::sync::Mutex;

use authflow_core::deps::Clock;
use chrono::{DateTime, Duration, Utc};

/// A clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// A clock frozen at the current wall time.
    #[must_use]
    pub fn new() -> Self {
        Self { now: Mutex::new(Utc::now()) }
    }

    /// Move the clock forward.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FixedClock {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
