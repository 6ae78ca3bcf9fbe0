//! Mock identity store.

use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::deps::IdentityStore;
use authflow_core::error::{FlowError, Result};
use authflow_core::identity::{IdentityInfo, LoginIdType};
use authflow_core::ids::IdentityId;

use super::lock;

/// In-memory identity store.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identities: Mutex<Vec<IdentityInfo>>,
}

impl MemoryIdentityStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identity without uniqueness checks, for test setup.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn seed(&self, identity: IdentityInfo) {
        self.identities.lock().unwrap().push(identity);
    }

    /// Fetch an identity by id, for assertions.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn get(&self, id: IdentityId) -> Option<IdentityInfo> {
        self.identities.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }

    /// Number of stored identities, for assertions.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn len(&self) -> usize {
        self.identities.lock().unwrap().len()
    }

    /// Whether the store is empty.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn is_empty(&self) -> bool {
        self.identities.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_by_login_id(
        &self,
        r#type: LoginIdType,
        value: &str,
    ) -> Result<Option<IdentityInfo>> {
        let identities = lock(&self.identities)?;
        Ok(identities
            .iter()
            .find(|identity| {
                identity.login_id_type() == Some(r#type)
                    && identity.login_id_value() == Some(value)
            })
            .cloned())
    }

    async fn create(&self, identity: &IdentityInfo) -> Result<()> {
        let mut identities = lock(&self.identities)?;
        if let (Some(r#type), Some(value)) = (identity.login_id_type(), identity.login_id_value())
        {
            let duplicate = identities.iter().any(|existing| {
                existing.login_id_type() == Some(r#type)
                    && existing.login_id_value() == Some(value)
            });
            if duplicate {
                return Err(FlowError::DuplicatedIdentity);
            }
        }
        identities.push(identity.clone());
        Ok(())
    }

    async fn mark_claim_verified(&self, identity_id: IdentityId) -> Result<()> {
        let mut identities = lock(&self.identities)?;
        match identities.iter_mut().find(|identity| identity.id == identity_id) {
            Some(identity) => {
                identity.claim_verified = true;
                Ok(())
            }
            None => Err(FlowError::Store(format!("identity {identity_id} not found"))),
        }
    }
}
