//! A new identity was established at a signup identify step.

use async_trait::async_trait;
use authflow_core::deps::Dependencies;
use authflow_core::effect::Effect;
use authflow_core::{smallvec, SmallVec};
use authflow_core::error::Result;
use authflow_core::event::FlowEvent;
use authflow_core::identity::IdentityInfo;
use authflow_core::ids::UserId;
use authflow_core::milestone::Milestone;
use authflow_core::reactor::{FlowView, Kinded, NodeSimple};
use serde::{Deserialize, Serialize};

/// Carries the identity a signup will create. Persisted only at commit;
/// the store re-checks uniqueness then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoCreateIdentity {
    /// The identity to create.
    pub identity: IdentityInfo,
}

impl Kinded for NodeDoCreateIdentity {
    const KIND: &'static str = "NodeDoCreateIdentity";
}

impl Milestone for NodeDoCreateIdentity {
    fn did_select_identity(&self) -> Option<&IdentityInfo> {
        Some(&self.identity)
    }

    fn did_determine_user(&self) -> Option<UserId> {
        Some(self.identity.user_id)
    }
}

#[async_trait]
impl NodeSimple for NodeDoCreateIdentity {
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
            Effect::CreateIdentity { identity: self.identity.clone() },
            Effect::DispatchEvent {
                event: FlowEvent::IdentityCreated {
                    identity_id: self.identity.id,
                    user_id: self.identity.user_id,
                },
            },
        ])
    }
}
