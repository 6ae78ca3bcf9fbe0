//! Mock user store.

use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::deps::UserStore;
use authflow_core::error::Result;
use authflow_core::ids::UserId;

use super::lock;

/// In-memory user store; records created users for assertions.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    created: Mutex<Vec<UserId>>,
}

impl MemoryUserStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Users created through the store, in order.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn created(&self) -> Vec<UserId> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user_id: UserId) -> Result<()> {
        lock(&self.created)?.push(user_id);
        Ok(())
    }
}
