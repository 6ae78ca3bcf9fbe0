//! A login-ID claim passed out-of-band verification.

use async_trait::async_trait;
use authflow_core::deps::Dependencies;
use authflow_core::effect::Effect;
use authflow_core::{smallvec, SmallVec};
use authflow_core::error::Result;
use authflow_core::event::FlowEvent;
use authflow_core::ids::{IdentityId, UserId};
use authflow_core::reactor::{FlowView, Kinded, NodeSimple};
use serde::{Deserialize, Serialize};

/// Records the verification; the store is updated only at commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoMarkClaimVerified {
    /// The identity whose claim was verified.
    pub identity_id: IdentityId,
    /// The owning user.
    pub user_id: UserId,
}

impl Kinded for NodeDoMarkClaimVerified {
    const KIND: &'static str = "NodeDoMarkClaimVerified";
}

#[async_trait]
impl NodeSimple for NodeDoMarkClaimVerified {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    async fn effects(
        &self,
        _deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<SmallVec<[Effect; 4]>> {
        Ok(smallvec![
            Effect::MarkClaimVerified { identity_id: self.identity_id },
            Effect::DispatchEvent {
                event: FlowEvent::ClaimVerified {
                    identity_id: self.identity_id,
                    user_id: self.user_id,
                },
            },
        ])
    }
}
