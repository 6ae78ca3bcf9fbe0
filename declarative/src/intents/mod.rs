//! Intent kinds: the decision points driving configured flows.
//!
//! Root intents (`IntentLoginFlow`, `IntentSignupFlow`,
//! `IntentReauthFlow`) own a whole instance; `IntentFlowSteps` executes
//! one steps list; one step intent per configured step type owns that
//! step's sub-flow.

mod login;
mod reauth;
mod signup;
mod step_authenticate;
mod step_create_authenticator;
mod step_identify;
mod step_verify;
mod steps;

pub use login::IntentLoginFlow;
pub use reauth::IntentReauthFlow;
pub use signup::IntentSignupFlow;
pub use step_authenticate::IntentFlowStepAuthenticate;
pub use step_create_authenticator::IntentFlowStepCreateAuthenticator;
pub use step_identify::IntentFlowStepIdentify;
pub use step_verify::IntentFlowStepVerify;
pub use steps::IntentFlowSteps;
