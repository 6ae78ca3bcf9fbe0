//! # Authflow Declarative
//!
//! Configuration-driven authentication flows on top of `authflow-core`:
//! login, signup and reauthentication, each executing the steps a tenant
//! configured rather than hard-coded sequences.
//!
//! The crate contributes three things to the engine:
//!
//! - **Intents and nodes** for every configured step type, registered
//!   with the kind registry by [`register_kinds`]
//! - **Step policy**: deriving which configured branches the current
//!   user can actually take, from the live stores on every inspection
//! - **Mock collaborators** (behind the `test-utils` feature) so whole
//!   flows run at memory speed in tests
//!
//! ## Example: driving a login flow
//!
//! ```rust,ignore
//! use authflow_declarative::{default_registry, new_login_flow};
//! use authflow_core::{accept, finalize, FlowError};
//!
//! let mut instance = new_login_flow(&deps).await?;
//! accept(&deps, &mut instance, &serde_json::json!({
//!     "login_id": "jane@example.com",
//! })).await?;
//! match accept(&deps, &mut instance, &serde_json::json!({
//!     "authentication": "primary_password",
//!     "password": "hunter2",
//! })).await {
//!     Err(FlowError::Eof) => { finalize(&deps, &instance).await?; }
//!     other => other?,
//! }
//! ```

pub mod inputs;
pub mod intents;
pub mod mask;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod nodes;
pub mod output;
pub mod policy;

use authflow_core::config::FlowType;
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::flow::FlowInstance;
use authflow_core::ids::UserId;
use authflow_core::registry::FlowRegistry;
use authflow_core::traversal::advance;

use intents::{
    IntentFlowStepAuthenticate, IntentFlowStepCreateAuthenticator, IntentFlowStepIdentify,
    IntentFlowStepVerify, IntentFlowSteps, IntentLoginFlow, IntentReauthFlow, IntentSignupFlow,
};
use nodes::{
    NodeDoCreateAuthenticator, NodeDoCreateIdentity, NodeDoCreateSession, NodeDoCreateUser,
    NodeDoMarkClaimVerified, NodeDoUseAuthenticatorSimple, NodeDoUseIdentity,
    NodeDoUseRecoveryCode, NodeUseAuthenticatorOobOtp, NodeVerifyClaim,
};

/// Register every intent and node kind this crate defines.
///
/// Call once at bootstrap; rehydrating a persisted instance fails with
/// [`FlowError::UnknownKind`] for any kind missing here.
pub fn register_kinds(registry: &mut FlowRegistry) {
    registry.register_intent::<IntentLoginFlow>();
    registry.register_intent::<IntentSignupFlow>();
    registry.register_intent::<IntentReauthFlow>();
    registry.register_intent::<IntentFlowSteps>();
    registry.register_intent::<IntentFlowStepIdentify>();
    registry.register_intent::<IntentFlowStepAuthenticate>();
    registry.register_intent::<IntentFlowStepVerify>();
    registry.register_intent::<IntentFlowStepCreateAuthenticator>();

    registry.register_node::<NodeDoCreateUser>();
    registry.register_node::<NodeDoUseIdentity>();
    registry.register_node::<NodeDoCreateIdentity>();
    registry.register_node::<NodeDoUseAuthenticatorSimple>();
    registry.register_node::<NodeDoUseRecoveryCode>();
    registry.register_node::<NodeUseAuthenticatorOobOtp>();
    registry.register_node::<NodeVerifyClaim>();
    registry.register_node::<NodeDoMarkClaimVerified>();
    registry.register_node::<NodeDoCreateAuthenticator>();
    registry.register_node::<NodeDoCreateSession>();
}

/// A registry with every kind of this crate registered.
#[must_use]
pub fn default_registry() -> FlowRegistry {
    let mut registry = FlowRegistry::new();
    register_kinds(&mut registry);
    registry
}

/// Start a login flow, advanced to its first wait point.
///
/// # Errors
///
/// Propagates reactor errors from the initial auto-advance.
pub async fn new_login_flow(deps: &Dependencies) -> Result<FlowInstance> {
    let name = deps.config.login.name.clone();
    let instance = FlowInstance::new(FlowType::Login, name.clone(), Box::new(IntentLoginFlow { name }));
    start(deps, instance).await
}

/// Start a signup flow, advanced to its first wait point.
///
/// # Errors
///
/// Propagates reactor errors from the initial auto-advance.
pub async fn new_signup_flow(deps: &Dependencies) -> Result<FlowInstance> {
    let name = deps.config.signup.name.clone();
    let instance =
        FlowInstance::new(FlowType::Signup, name.clone(), Box::new(IntentSignupFlow { name }));
    start(deps, instance).await
}

/// Start a reauth flow for a known user, advanced to its first wait
/// point.
///
/// # Errors
///
/// Propagates reactor errors from the initial auto-advance, notably
/// [`FlowError::NoUsableAuthenticationMethod`].
pub async fn new_reauth_flow(deps: &Dependencies, user_id: UserId) -> Result<FlowInstance> {
    let name = deps.config.reauth.name.clone();
    let instance = FlowInstance::new(
        FlowType::Reauth,
        name.clone(),
        Box::new(IntentReauthFlow { name, user_id }),
    );
    start(deps, instance).await
}

async fn start(deps: &Dependencies, mut instance: FlowInstance) -> Result<FlowInstance> {
    match advance(deps, &mut instance).await {
        // A flow that finishes without input still gets returned; the
        // caller finalizes it like any other.
        Ok(()) | Err(FlowError::Eof) => Ok(instance),
        Err(err) => Err(err),
    }
}
