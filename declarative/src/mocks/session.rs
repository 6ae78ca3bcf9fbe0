//! Mock session service.

use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::deps::SessionService;
use authflow_core::error::Result;
use authflow_core::ids::SessionId;
use authflow_core::session::{Session, SessionAttrs};
use chrono::{Duration, Utc};

use super::lock;

/// In-memory session issuance; captures every attribute set it saw.
#[derive(Debug, Default)]
pub struct MockSessionService {
    created: Mutex<Vec<SessionAttrs>>,
}

impl MockSessionService {
    /// A service that has issued nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute sets sessions were created with, in order.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn created(&self) -> Vec<SessionAttrs> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionService for MockSessionService {
    async fn create(&self, attrs: &SessionAttrs) -> Result<Session> {
        lock(&self.created)?.push(attrs.clone());
        let now = Utc::now();
        Ok(Session {
            id: SessionId::new(),
            user_id: attrs.user_id,
            amr: attrs.amr.clone(),
            created_at: now,
            expires_at: now + Duration::hours(24),
        })
    }
}
