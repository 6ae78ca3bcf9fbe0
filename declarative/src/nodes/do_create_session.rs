//! The terminal fact of a successful flow: a session to issue.

use async_trait::async_trait;
use authflow_core::deps::Dependencies;
use authflow_core::effect::Effect;
use authflow_core::{smallvec, SmallVec};
use authflow_core::error::Result;
use authflow_core::event::FlowEvent;
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Kinded, NodeSimple};
use authflow_core::session::SessionAttrs;
use serde::{Deserialize, Serialize};

/// Carries the session attributes derived from the flow's milestones.
/// The session itself is issued only at commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoCreateSession {
    /// Attributes for the session to issue.
    pub attrs: SessionAttrs,
}

impl Kinded for NodeDoCreateSession {
    const KIND: &'static str = "NodeDoCreateSession";
}

#[async_trait]
impl NodeSimple for NodeDoCreateSession {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    async fn effects(
        &self,
        _deps: &Dependencies,
        flows: FlowView<'_>,
    ) -> Result<SmallVec<[Effect; 4]>> {
        let mut effects: SmallVec<[Effect; 4]> = smallvec![
            Effect::CreateSession { attrs: self.attrs.clone() },
            Effect::DispatchEvent {
                event: FlowEvent::UserAuthenticated {
                    user_id: self.attrs.user_id,
                    amr: self.attrs.amr.clone(),
                    flow_type: self.attrs.flow_type,
                },
            },
        ];
        // A committed authentication ends the lockout bracket for good.
        if milestone::used_lockout_method(flows.root) {
            effects.push(Effect::ClearLockoutAttempts { user_id: self.attrs.user_id });
        }
        Ok(effects)
    }
}
