//! Integration tests for the configured signup flow.

use authflow_core::authenticator::AuthenticatorType;
use authflow_core::config::{
    AuthenticationBranch, AuthenticationMethod, FlowConfig, FlowStepConfig, FlowsConfig,
    Identification, IdentificationBranch, OtpConfig,
};
use authflow_core::deps::OtpPurpose;
use authflow_core::effect::finalize;
use authflow_core::error::FlowError;
use authflow_core::event::FlowEvent;
use authflow_core::identity::{IdentityInfo, LoginIdType};
use authflow_core::ids::UserId;
use authflow_core::traversal::accept;
use authflow_declarative::mocks::TestContext;
use authflow_declarative::new_signup_flow;
use serde_json::json;

const EMAIL: &str = "jane@example.com";

fn signup_config(steps: Vec<FlowStepConfig>) -> FlowsConfig {
    FlowsConfig {
        login: FlowConfig { name: "default".into(), steps: vec![] },
        signup: FlowConfig { name: "default".into(), steps },
        reauth: FlowConfig { name: "default".into(), steps: vec![] },
        anonymous_users_enabled: false,
        otp: OtpConfig::default(),
    }
}

fn identify(one_of: &[Identification]) -> FlowStepConfig {
    FlowStepConfig::Identify {
        one_of: one_of
            .iter()
            .map(|&identification| IdentificationBranch { identification, steps: vec![] })
            .collect(),
    }
}

fn create_authenticator(methods: &[AuthenticationMethod]) -> FlowStepConfig {
    FlowStepConfig::CreateAuthenticator {
        one_of: methods
            .iter()
            .map(|&authentication| AuthenticationBranch { authentication, steps: vec![] })
            .collect(),
    }
}

fn email_signup_config() -> FlowsConfig {
    signup_config(vec![
        identify(&[Identification::Email]),
        FlowStepConfig::Verify,
        create_authenticator(&[AuthenticationMethod::PrimaryPassword]),
    ])
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn full_signup_commits_effects_in_graph_order() {
    let ctx = TestContext::new(email_signup_config());

    let mut instance = new_signup_flow(&ctx.deps).await.unwrap();

    // Nothing is persisted while the flow is in progress.
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();
    assert!(ctx.users.created().is_empty());
    assert!(ctx.identities.is_empty());
    assert_eq!(ctx.otp.sent().len(), 1);

    let code = ctx.otp.last_code(EMAIL, OtpPurpose::VerifyClaim).unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "code": code })).await.unwrap();

    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "new_password": "s3cret pass" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    let session = result.session.unwrap();

    // One user, one identity with its claim verified, one password.
    let created_users = ctx.users.created();
    assert_eq!(created_users.len(), 1);
    let user_id = created_users[0];
    assert_eq!(session.user_id, user_id);
    assert!(session.amr.is_empty());

    let authenticators = ctx.authenticators.all();
    assert_eq!(authenticators.len(), 1);
    assert_eq!(authenticators[0].r#type, AuthenticatorType::Password);
    assert_eq!(authenticators[0].user_id, user_id);

    // Events arrive in graph order: creation before verification before
    // the session.
    let events = ctx.events.dispatched();
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], FlowEvent::UserSignedUp { .. }));
    assert!(matches!(events[1], FlowEvent::IdentityCreated { .. }));
    assert!(matches!(events[2], FlowEvent::ClaimVerified { .. }));
    assert!(matches!(events[3], FlowEvent::AuthenticatorCreated { .. }));
    assert!(matches!(events[4], FlowEvent::UserAuthenticated { .. }));

    let FlowEvent::IdentityCreated { identity_id, .. } = &events[1] else {
        panic!("expected IdentityCreated");
    };
    let identity = ctx.identities.get(*identity_id).unwrap();
    assert!(identity.claim_verified);
    assert_eq!(identity.login_id_value(), Some(EMAIL));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn existing_login_id_is_a_duplicate() {
    let ctx = TestContext::new(email_signup_config());
    ctx.identities.seed(IdentityInfo::new_login_id(UserId::new(), LoginIdType::Email, EMAIL));

    let mut instance = new_signup_flow(&ctx.deps).await.unwrap();
    let rejected = accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await;
    assert!(matches!(rejected, Err(FlowError::DuplicatedIdentity)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn verify_step_is_skipped_without_a_verifiable_claim() {
    let ctx = TestContext::new(signup_config(vec![
        identify(&[Identification::Username]),
        FlowStepConfig::Verify,
        create_authenticator(&[AuthenticationMethod::PrimaryPassword]),
    ]));

    let mut instance = new_signup_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": "janedoe" })).await.unwrap();

    // Usernames carry no verifiable claim, so no code goes out and the
    // flow falls through to authenticator creation.
    assert!(ctx.otp.sent().is_empty());
    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "new_password": "s3cret pass" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn oob_authenticator_defaults_to_the_identity_claim() {
    let ctx = TestContext::new(signup_config(vec![
        identify(&[Identification::Email]),
        create_authenticator(&[AuthenticationMethod::PrimaryOobOtpEmail]),
    ]));

    let mut instance = new_signup_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_oob_otp_email" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    finalize(&ctx.deps, &instance).await.unwrap();
    let authenticators = ctx.authenticators.all();
    assert_eq!(authenticators.len(), 1);
    assert_eq!(authenticators[0].r#type, AuthenticatorType::OobOtpEmail);
    assert_eq!(authenticators[0].oob_target.as_deref(), Some(EMAIL));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn totp_cannot_be_provisioned_declaratively() {
    let ctx = TestContext::new(signup_config(vec![
        identify(&[Identification::Email]),
        create_authenticator(&[
            AuthenticationMethod::PrimaryPassword,
            AuthenticationMethod::SecondaryTotp,
        ]),
    ]));

    let mut instance = new_signup_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    let rejected =
        accept(&ctx.deps, &mut instance, &json!({ "authentication": "secondary_totp" })).await;
    assert!(matches!(rejected, Err(FlowError::ConfigurationViolated { .. })));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn anonymous_signup_needs_no_login_id() {
    let mut config = signup_config(vec![identify(&[Identification::Anonymous])]);
    config.anonymous_users_enabled = true;
    let ctx = TestContext::new(config);

    let mut instance = new_signup_flow(&ctx.deps).await.unwrap();
    let terminal =
        accept(&ctx.deps, &mut instance, &json!({ "identification": "anonymous" })).await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    let session = result.session.unwrap();
    assert_eq!(ctx.users.created(), vec![session.user_id]);
    assert_eq!(ctx.identities.len(), 1);
}
