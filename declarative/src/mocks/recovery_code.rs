//! Mock recovery code store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::deps::RecoveryCodeStore;
use authflow_core::error::{FlowError, Result};
use authflow_core::ids::UserId;

use super::lock;

/// One-shot recovery codes held in memory; consuming a code removes it.
#[derive(Debug, Default)]
pub struct MockRecoveryCodeStore {
    codes: Mutex<HashMap<UserId, Vec<String>>>,
}

impl MockRecoveryCodeStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed unused codes for a user.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn seed(&self, user_id: UserId, codes: &[&str]) {
        self.codes
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .extend(codes.iter().map(ToString::to_string));
    }

    /// Codes still unused for a user.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn remaining(&self, user_id: UserId) -> Vec<String> {
        self.codes.lock().unwrap().get(&user_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RecoveryCodeStore for MockRecoveryCodeStore {
    async fn consume(&self, user_id: UserId, code: &str) -> Result<()> {
        let mut codes = lock(&self.codes)?;
        let Some(remaining) = codes.get_mut(&user_id) else {
            return Err(FlowError::InvalidCredentials);
        };
        match remaining.iter().position(|c| c == code) {
            Some(index) => {
                remaining.remove(index);
                Ok(())
            }
            None => Err(FlowError::InvalidCredentials),
        }
    }
}
