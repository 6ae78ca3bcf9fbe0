//! A new authenticator was prepared at a create-authenticator step.

use async_trait::async_trait;
use authflow_core::authenticator::AuthenticatorInfo;
use authflow_core::config::AuthenticationMethod;
use authflow_core::deps::Dependencies;
use authflow_core::effect::Effect;
use authflow_core::{smallvec, SmallVec};
use authflow_core::error::Result;
use authflow_core::event::FlowEvent;
use authflow_core::milestone::Milestone;
use authflow_core::reactor::{FlowView, Kinded, NodeSimple};
use serde::{Deserialize, Serialize};

/// Carries a fully built (hashed) authenticator awaiting commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoCreateAuthenticator {
    /// The method the branch selected.
    pub method: AuthenticationMethod,
    /// The authenticator to persist.
    pub authenticator: AuthenticatorInfo,
}

impl Kinded for NodeDoCreateAuthenticator {
    const KIND: &'static str = "NodeDoCreateAuthenticator";
}

impl Milestone for NodeDoCreateAuthenticator {
    fn authentication_method(&self) -> Option<AuthenticationMethod> {
        Some(self.method)
    }
}

#[async_trait]
impl NodeSimple for NodeDoCreateAuthenticator {
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
            Effect::CreateAuthenticator { authenticator: self.authenticator.clone() },
            Effect::DispatchEvent {
                event: FlowEvent::AuthenticatorCreated {
                    authenticator_id: self.authenticator.id,
                    user_id: self.authenticator.user_id,
                },
            },
        ])
    }
}
