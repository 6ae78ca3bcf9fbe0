//! An existing identity was selected at an identify step.

use authflow_core::error::Result;
use authflow_core::identity::IdentityInfo;
use authflow_core::ids::UserId;
use authflow_core::milestone::Milestone;
use authflow_core::reactor::{Kinded, NodeSimple};
use serde::{Deserialize, Serialize};

/// Selects a stored identity and thereby pins the flow to its user. No
/// effects: using an identity changes nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoUseIdentity {
    /// The selected identity.
    pub identity: IdentityInfo,
}

impl Kinded for NodeDoUseIdentity {
    const KIND: &'static str = "NodeDoUseIdentity";
}

impl Milestone for NodeDoUseIdentity {
    fn did_select_identity(&self) -> Option<&IdentityInfo> {
        Some(&self.identity)
    }

    fn did_determine_user(&self) -> Option<UserId> {
        Some(self.identity.user_id)
    }
}

impl NodeSimple for NodeDoUseIdentity {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn milestone(&self) -> Option<&dyn Milestone> {
        Some(self)
    }
}
