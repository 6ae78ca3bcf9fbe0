//! Events dispatched from the effect commit pass.

use crate::config::FlowType;
use crate::ids::{AuthenticatorId, IdentityId, UserId};
use crate::session::Amr;
use serde::{Deserialize, Serialize};

/// An audit/webhook event produced by a committed flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// A user authenticated and a session was issued.
    UserAuthenticated {
        /// The authenticated user.
        user_id: UserId,
        /// Methods used.
        amr: Vec<Amr>,
        /// Which flow issued the session.
        flow_type: FlowType,
    },
    /// A new user signed up.
    UserSignedUp {
        /// The new user.
        user_id: UserId,
    },
    /// A new identity was attached to a user.
    IdentityCreated {
        /// The identity.
        identity_id: IdentityId,
        /// The owning user.
        user_id: UserId,
    },
    /// A new authenticator was attached to a user.
    AuthenticatorCreated {
        /// The authenticator.
        authenticator_id: AuthenticatorId,
        /// The owning user.
        user_id: UserId,
    },
    /// A login-ID claim was verified out of band.
    ClaimVerified {
        /// The identity whose claim was verified.
        identity_id: IdentityId,
        /// The owning user.
        user_id: UserId,
    },
}
