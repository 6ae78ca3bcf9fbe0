//! Node kinds: committed facts and pending credential checks.
//!
//! `NodeDo*` kinds are settled facts that only answer milestones and
//! contribute effects. The remaining kinds represent a check still in
//! progress (an out-of-band code on its way) and override the reactor
//! methods.

mod do_create_authenticator;
mod do_create_identity;
mod do_create_session;
mod do_create_user;
mod do_mark_claim_verified;
mod do_use_authenticator;
mod do_use_identity;
mod do_use_recovery_code;
mod use_authenticator_oob_otp;
mod verify_claim;

pub use do_create_authenticator::NodeDoCreateAuthenticator;
pub use do_create_identity::NodeDoCreateIdentity;
pub use do_create_session::NodeDoCreateSession;
pub use do_create_user::NodeDoCreateUser;
pub use do_mark_claim_verified::NodeDoMarkClaimVerified;
pub use do_use_authenticator::NodeDoUseAuthenticatorSimple;
pub use do_use_identity::NodeDoUseIdentity;
pub use do_use_recovery_code::NodeDoUseRecoveryCode;
pub use use_authenticator_oob_otp::NodeUseAuthenticatorOobOtp;
pub use verify_claim::NodeVerifyClaim;
