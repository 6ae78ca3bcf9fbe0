//! Flow persistence.
//!
//! Instances live outside the process between requests. The store deals
//! in serialized payloads so it stays independent of the kind registry;
//! callers rehydrate with [`FlowInstance::from_json`]. Concurrent
//! clients racing on one instance are arbitrated with optimistic
//! revisions: every update names the revision it read, and a mismatch is
//! rejected as [`FlowError::RevisionConflict`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::deps::Clock;
use crate::error::{FlowError, Result};
use crate::flow::FlowInstance;
use crate::ids::FlowId;

/// Monotonic per-instance revision for optimistic concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    /// The revision assigned to a freshly created record.
    pub const INITIAL: Self = Self(1);

    #[must_use]
    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A persisted flow instance in serialized form.
#[derive(Debug, Clone)]
pub struct FlowRecord {
    /// The instance identifier.
    pub id: FlowId,
    /// Serialized instance, as produced by [`FlowInstance::to_json`].
    pub payload: serde_json::Value,
    /// The revision this payload was read at.
    pub revision: Revision,
}

/// Persistence contract for flow instances.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Fetch an instance by id.
    ///
    /// # Errors
    ///
    /// [`FlowError::FlowNotFound`] when the id is unknown or the record
    /// has outlived its TTL.
    async fn load(&self, id: FlowId) -> Result<FlowRecord>;

    /// Persist a brand-new instance at [`Revision::INITIAL`].
    ///
    /// # Errors
    ///
    /// Serialization and backend failures.
    async fn create(&self, instance: &FlowInstance) -> Result<Revision>;

    /// Persist an advanced instance, guarded by the revision the caller
    /// read.
    ///
    /// # Errors
    ///
    /// [`FlowError::RevisionConflict`] when another client advanced the
    /// instance first; [`FlowError::FlowNotFound`] when it no longer
    /// exists.
    async fn update(&self, instance: &FlowInstance, expected: Revision) -> Result<Revision>;

    /// Drop an instance, typically after finalize.
    ///
    /// # Errors
    ///
    /// Backend failures; deleting an unknown id is not an error.
    async fn delete(&self, id: FlowId) -> Result<()>;
}

struct StoredFlow {
    payload: serde_json::Value,
    revision: Revision,
    expires_at: DateTime<Utc>,
}

/// In-memory [`FlowStore`] with lazy TTL expiry.
pub struct MemoryFlowStore {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    records: Mutex<HashMap<FlowId, StoredFlow>>,
}

impl MemoryFlowStore {
    /// A store whose records expire `ttl` after their last write.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { clock, ttl, records: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn load(&self, id: FlowId) -> Result<FlowRecord> {
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        match records.get(&id) {
            Some(stored) if stored.expires_at > now => Ok(FlowRecord {
                id,
                payload: stored.payload.clone(),
                revision: stored.revision,
            }),
            Some(_) => {
                records.remove(&id);
                Err(FlowError::FlowNotFound)
            }
            None => Err(FlowError::FlowNotFound),
        }
    }

    async fn create(&self, instance: &FlowInstance) -> Result<Revision> {
        let payload = instance.to_json()?;
        let expires_at = self.clock.now() + self.ttl;
        let mut records = self.records.lock().await;
        records.insert(
            instance.id,
            StoredFlow { payload, revision: Revision::INITIAL, expires_at },
        );
        Ok(Revision::INITIAL)
    }

    async fn update(&self, instance: &FlowInstance, expected: Revision) -> Result<Revision> {
        let payload = instance.to_json()?;
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        let Some(stored) = records.get_mut(&instance.id) else {
            return Err(FlowError::FlowNotFound);
        };
        if stored.expires_at <= now {
            records.remove(&instance.id);
            return Err(FlowError::FlowNotFound);
        }
        if stored.revision != expected {
            return Err(FlowError::RevisionConflict);
        }
        stored.payload = payload;
        stored.revision = stored.revision.next();
        stored.expires_at = now + self.ttl;
        Ok(stored.revision)
    }

    async fn delete(&self, id: FlowId) -> Result<()> {
        self.records.lock().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::FlowType;
    use crate::input::{FlowInput, InputSchema};
    use crate::reactor::{FlowView, Intent, ReactResult};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug)]
    struct StubIntent;

    #[async_trait]
    impl Intent for StubIntent {
        fn kind(&self) -> &'static str {
            "stub_intent"
        }

        fn data(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }

        async fn can_react_to(
            &self,
            _deps: &crate::deps::Dependencies,
            _flows: FlowView<'_>,
        ) -> Result<Option<Box<dyn InputSchema>>> {
            Err(FlowError::Eof)
        }

        async fn react_to(
            &self,
            _deps: &crate::deps::Dependencies,
            _flows: FlowView<'_>,
            _input: &FlowInput,
        ) -> Result<ReactResult> {
            Err(FlowError::IncompatibleInput)
        }
    }

    struct FixedClock(StdMutex<DateTime<Utc>>);

    impl FixedClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(StdMutex::new(Utc::now())))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn instance() -> FlowInstance {
        FlowInstance::new(FlowType::Login, "default", Box::new(StubIntent))
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let store = MemoryFlowStore::new(FixedClock::new(), Duration::minutes(30));
        let flow = instance();
        let revision = store.create(&flow).await.unwrap();
        assert_eq!(revision, Revision::INITIAL);

        let record = store.load(flow.id).await.unwrap();
        assert_eq!(record.id, flow.id);
        assert_eq!(record.revision, Revision::INITIAL);
        assert_eq!(record.payload, flow.to_json().unwrap());
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = MemoryFlowStore::new(FixedClock::new(), Duration::minutes(30));
        let flow = instance();
        let first = store.create(&flow).await.unwrap();

        let second = store.update(&flow, first).await.unwrap();
        assert!(second > first);

        // A client still holding the original revision loses the race.
        assert_eq!(store.update(&flow, first).await, Err(FlowError::RevisionConflict));
        // The winner's revision still works.
        store.update(&flow, second).await.unwrap();
    }

    #[tokio::test]
    async fn records_expire_after_ttl() {
        let clock = FixedClock::new();
        let store = MemoryFlowStore::new(Arc::clone(&clock) as Arc<dyn Clock>, Duration::minutes(30));
        let flow = instance();
        let revision = store.create(&flow).await.unwrap();

        clock.advance(Duration::minutes(29));
        store.load(flow.id).await.unwrap();

        clock.advance(Duration::minutes(2));
        assert_eq!(store.load(flow.id).await.unwrap_err(), FlowError::FlowNotFound);
        assert_eq!(store.update(&flow, revision).await, Err(FlowError::FlowNotFound));
    }

    #[tokio::test]
    async fn writes_refresh_the_ttl() {
        let clock = FixedClock::new();
        let store = MemoryFlowStore::new(Arc::clone(&clock) as Arc<dyn Clock>, Duration::minutes(30));
        let flow = instance();
        let revision = store.create(&flow).await.unwrap();

        clock.advance(Duration::minutes(20));
        let revision = store.update(&flow, revision).await.unwrap();

        // 25 minutes past creation but only 5 past the update.
        clock.advance(Duration::minutes(5));
        let record = store.load(flow.id).await.unwrap();
        assert_eq!(record.revision, revision);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryFlowStore::new(FixedClock::new(), Duration::minutes(30));
        let flow = instance();
        store.create(&flow).await.unwrap();
        store.delete(flow.id).await.unwrap();
        store.delete(flow.id).await.unwrap();
        assert_eq!(store.load(flow.id).await.unwrap_err(), FlowError::FlowNotFound);
    }
}
