//! Mock passkey service.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::authenticator::AuthenticatorInfo;
use authflow_core::deps::PasskeyService;
use authflow_core::error::{FlowError, Result};
use authflow_core::ids::UserId;
use serde_json::Value;

use super::lock;

/// Verifies assertions by exact match against registered expectations.
#[derive(Debug, Default)]
pub struct MockPasskeyService {
    registered: Mutex<HashMap<UserId, (Value, AuthenticatorInfo)>>,
}

impl MockPasskeyService {
    /// A service with no registered passkeys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the assertion that will verify for `user_id`, and the
    /// authenticator that verification proves possession of.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn register(&self, user_id: UserId, assertion: Value, info: AuthenticatorInfo) {
        self.registered.lock().unwrap().insert(user_id, (assertion, info));
    }
}

#[async_trait]
impl PasskeyService for MockPasskeyService {
    async fn verify_assertion(
        &self,
        user_id: UserId,
        assertion: &Value,
    ) -> Result<AuthenticatorInfo> {
        let registered = lock(&self.registered)?;
        match registered.get(&user_id) {
            Some((expected, info)) if expected == assertion => Ok(info.clone()),
            _ => Err(FlowError::InvalidCredentials),
        }
    }
}
