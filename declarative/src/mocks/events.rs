//! Mock event sink.

use std::sync::Mutex;

use async_trait::async_trait;
use authflow_core::deps::EventSink;
use authflow_core::error::Result;
use authflow_core::event::FlowEvent;

use super::lock;

/// Records every dispatched event in order.
#[derive(Debug, Default)]
pub struct MockEventSink {
    dispatched: Mutex<Vec<FlowEvent>>,
}

impl MockEventSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events dispatched so far, in order.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn dispatched(&self) -> Vec<FlowEvent> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for MockEventSink {
    async fn dispatch(&self, event: &FlowEvent) -> Result<()> {
        lock(&self.dispatched)?.push(event.clone());
        Ok(())
    }
}
