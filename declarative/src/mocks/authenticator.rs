//! Mock authenticator store with plaintext secret comparison.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::authenticator::{
    apply_filters, AuthenticatorFilter, AuthenticatorInfo, AuthenticatorKind, AuthenticatorSpec,
    AuthenticatorType, VerifyResult,
};
use authflow_core::deps::AuthenticatorStore;
use authflow_core::error::{FlowError, Result};
use authflow_core::ids::{AuthenticatorId, UserId};
use chrono::Utc;

use super::lock;

/// In-memory authenticator store. Secrets are kept in plaintext and
/// compared directly — never do this outside tests.
#[derive(Debug, Default)]
pub struct MemoryAuthenticatorStore {
    authenticators: Mutex<Vec<AuthenticatorInfo>>,
    secrets: Mutex<HashMap<AuthenticatorId, String>>,
    pending_secrets: Mutex<HashMap<AuthenticatorId, String>>,
}

impl MemoryAuthenticatorStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a password authenticator, returning its info.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn seed_password(
        &self,
        user_id: UserId,
        kind: AuthenticatorKind,
        password: &str,
    ) -> AuthenticatorInfo {
        let info = AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind,
            r#type: AuthenticatorType::Password,
            is_default: true,
            oob_target: None,
            created_at: Utc::now(),
        };
        self.authenticators.lock().unwrap().push(info.clone());
        self.secrets.lock().unwrap().insert(info.id, password.to_string());
        info
    }

    /// Seed a TOTP authenticator accepting a fixed code.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn seed_totp(&self, user_id: UserId, code: &str) -> AuthenticatorInfo {
        let info = AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind: AuthenticatorKind::Secondary,
            r#type: AuthenticatorType::Totp,
            is_default: true,
            oob_target: None,
            created_at: Utc::now(),
        };
        self.authenticators.lock().unwrap().push(info.clone());
        self.secrets.lock().unwrap().insert(info.id, code.to_string());
        info
    }

    /// Seed a passkey authenticator. Assertions are verified by the
    /// passkey service, not this store.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn seed_passkey(&self, user_id: UserId) -> AuthenticatorInfo {
        let info = AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind: AuthenticatorKind::Primary,
            r#type: AuthenticatorType::Passkey,
            is_default: false,
            oob_target: None,
            created_at: Utc::now(),
        };
        self.authenticators.lock().unwrap().push(info.clone());
        info
    }

    /// Seed an OOB-OTP authenticator delivering to `target`.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn seed_oob(
        &self,
        user_id: UserId,
        kind: AuthenticatorKind,
        r#type: AuthenticatorType,
        target: &str,
    ) -> AuthenticatorInfo {
        let info = AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind,
            r#type,
            is_default: false,
            oob_target: Some(target.to_string()),
            created_at: Utc::now(),
        };
        self.authenticators.lock().unwrap().push(info.clone());
        info
    }

    /// All persisted authenticators, for assertions.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn all(&self) -> Vec<AuthenticatorInfo> {
        self.authenticators.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthenticatorStore for MemoryAuthenticatorStore {
    async fn list(
        &self,
        user_id: UserId,
        filters: &[&dyn AuthenticatorFilter],
    ) -> Result<Vec<AuthenticatorInfo>> {
        let owned: Vec<AuthenticatorInfo> = lock(&self.authenticators)?
            .iter()
            .filter(|info| info.user_id == user_id)
            .cloned()
            .collect();
        Ok(apply_filters(owned, filters))
    }

    async fn verify_with_spec(
        &self,
        _user_id: UserId,
        r#type: AuthenticatorType,
        candidates: &[AuthenticatorInfo],
        spec: &AuthenticatorSpec,
    ) -> Result<VerifyResult> {
        let submitted = match spec {
            AuthenticatorSpec::Password { plain_password } => plain_password,
            AuthenticatorSpec::Totp { code } => code,
            AuthenticatorSpec::OobOtp { .. } => {
                return Err(FlowError::Internal(
                    "OOB specs are verified by the OTP service".into(),
                ));
            }
        };
        let secrets = lock(&self.secrets)?;
        for candidate in candidates {
            if candidate.r#type != r#type {
                continue;
            }
            if secrets.get(&candidate.id).is_some_and(|stored| stored == submitted) {
                return Ok(VerifyResult { authenticator: candidate.clone(), requires_update: false });
            }
        }
        Err(FlowError::InvalidCredentials)
    }

    async fn new_from_spec(
        &self,
        user_id: UserId,
        kind: AuthenticatorKind,
        r#type: AuthenticatorType,
        spec: &AuthenticatorSpec,
        is_default: bool,
    ) -> Result<AuthenticatorInfo> {
        let (secret, oob_target) = match spec {
            AuthenticatorSpec::Password { plain_password } => (Some(plain_password.clone()), None),
            AuthenticatorSpec::Totp { code } => (Some(code.clone()), None),
            AuthenticatorSpec::OobOtp { target } => (None, Some(target.clone())),
        };
        let info = AuthenticatorInfo {
            id: AuthenticatorId::new(),
            user_id,
            kind,
            r#type,
            is_default,
            oob_target,
            created_at: Utc::now(),
        };
        if let Some(secret) = secret {
            lock(&self.pending_secrets)?.insert(info.id, secret);
        }
        Ok(info)
    }

    async fn create(&self, info: &AuthenticatorInfo) -> Result<()> {
        if let Some(secret) = lock(&self.pending_secrets)?.remove(&info.id) {
            lock(&self.secrets)?.insert(info.id, secret);
        }
        lock(&self.authenticators)?.push(info.clone());
        Ok(())
    }
}
