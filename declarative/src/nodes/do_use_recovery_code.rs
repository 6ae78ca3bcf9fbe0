//! A recovery code was consumed in place of a second factor.

use authflow_core::authenticator::LockoutMethod;
use authflow_core::config::AuthenticationMethod;
use authflow_core::error::Result;
use authflow_core::milestone::Milestone;
use authflow_core::reactor::{Kinded, NodeSimple};
use authflow_core::session::Amr;
use serde::{Deserialize, Serialize};

/// The code itself was consumed at verification time by the recovery
/// code store; this fact only feeds milestones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDoUseRecoveryCode {}

impl Kinded for NodeDoUseRecoveryCode {
    const KIND: &'static str = "NodeDoUseRecoveryCode";
}

impl Milestone for NodeDoUseRecoveryCode {
    fn did_authenticate(&self) -> Option<Vec<Amr>> {
        Some(vec![Amr::RecoveryCode])
    }

    fn did_use_authentication_lockout_method(&self) -> Option<LockoutMethod> {
        Some(LockoutMethod::RecoveryCode)
    }

    fn authentication_method(&self) -> Option<AuthenticationMethod> {
        Some(AuthenticationMethod::RecoveryCode)
    }
}

impl NodeSimple for NodeDoUseRecoveryCode {
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
