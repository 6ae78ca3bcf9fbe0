//! An authenticator was verified successfully.

use authflow_core::authenticator::{AuthenticatorInfo, LockoutMethod};
use authflow_core::config::AuthenticationMethod;
use authflow_core::error::Result;
use authflow_core::milestone::Milestone;
use authflow_core::reactor::{Kinded, NodeSimple};
use authflow_core::session::Amr;
use serde::{Deserialize, Serialize};

/// The settled fact that a credential check passed, whatever mechanism
/// performed it. AMR values are derived from the authenticator itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoUseAuthenticatorSimple {
    /// The method the branch selected.
    pub method: AuthenticationMethod,
    /// The verified authenticator.
    pub authenticator: AuthenticatorInfo,
}

impl Kinded for NodeDoUseAuthenticatorSimple {
    const KIND: &'static str = "NodeDoUseAuthenticatorSimple";
}

impl Milestone for NodeDoUseAuthenticatorSimple {
    fn did_select_authenticator(&self) -> Option<&AuthenticatorInfo> {
        Some(&self.authenticator)
    }

    fn did_authenticate(&self) -> Option<Vec<Amr>> {
        Some(self.authenticator.amr())
    }

    fn did_use_authentication_lockout_method(&self) -> Option<LockoutMethod> {
        self.authenticator.r#type.lockout_method()
    }

    fn authentication_method(&self) -> Option<AuthenticationMethod> {
        Some(self.method)
    }
}

impl NodeSimple for NodeDoUseAuthenticatorSimple {
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
