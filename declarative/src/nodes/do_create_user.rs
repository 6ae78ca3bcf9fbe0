//! A new user record was allocated for this signup.

use async_trait::async_trait;
use authflow_core::deps::Dependencies;
use authflow_core::effect::Effect;
use authflow_core::{smallvec, SmallVec};
use authflow_core::error::Result;
use authflow_core::event::FlowEvent;
use authflow_core::ids::UserId;
use authflow_core::milestone::Milestone;
use authflow_core::reactor::{FlowView, Kinded, NodeSimple};
use serde::{Deserialize, Serialize};

/// Pins a signup flow to a freshly allocated user ID. The record is
/// persisted only at commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoCreateUser {
    /// The allocated user ID.
    pub user_id: UserId,
}

impl Kinded for NodeDoCreateUser {
    const KIND: &'static str = "NodeDoCreateUser";
}

impl Milestone for NodeDoCreateUser {
    fn did_determine_user(&self) -> Option<UserId> {
        Some(self.user_id)
    }
}

#[async_trait]
impl NodeSimple for NodeDoCreateUser {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn milestone(&self) -> Option<&dyn Milestone> {
        Some(self)
    }

    async fn effects(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<SmallVec<[Effect; 4]>> {
        Ok(smallvec![
            Effect::CreateUser { user_id: self.user_id },
            Effect::DispatchEvent { event: FlowEvent::UserSignedUp { user_id: self.user_id } },
        ])
    }
}
