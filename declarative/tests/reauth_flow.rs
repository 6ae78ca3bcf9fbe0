//! Integration tests for the configured reauthentication flow.

use authflow_core::authenticator::AuthenticatorKind;
use authflow_core::config::{
    AuthenticationBranch, AuthenticationMethod, FlowConfig, FlowStepConfig, FlowsConfig, OtpConfig,
};
use authflow_core::effect::finalize;
use authflow_core::error::FlowError;
use authflow_core::ids::UserId;
use authflow_core::session::Amr;
use authflow_core::traversal::accept;
use authflow_declarative::mocks::TestContext;
use authflow_declarative::new_reauth_flow;
use serde_json::json;

fn reauth_config(methods: &[AuthenticationMethod]) -> FlowsConfig {
    FlowsConfig {
        login: FlowConfig { name: "default".into(), steps: vec![] },
        signup: FlowConfig { name: "default".into(), steps: vec![] },
        reauth: FlowConfig {
            name: "default".into(),
            steps: vec![FlowStepConfig::Authenticate {
                one_of: methods
                    .iter()
                    .map(|&authentication| AuthenticationBranch { authentication, steps: vec![] })
                    .collect(),
            }],
        },
        anonymous_users_enabled: false,
        otp: OtpConfig::default(),
    }
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn reauth_skips_identification() {
    let ctx = TestContext::new(reauth_config(&[AuthenticationMethod::PrimaryPassword]));
    let user_id = UserId::new();
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    // The session already knows the user; the flow starts at the
    // authenticate step.
    let mut instance = new_reauth_flow(&ctx.deps, user_id).await.unwrap();
    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    let session = result.session.unwrap();
    assert_eq!(session.user_id, user_id);
    assert_eq!(session.amr, vec![Amr::Pwd]);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn reauth_without_usable_methods_fails_fast() {
    let ctx = TestContext::new(reauth_config(&[AuthenticationMethod::PrimaryPassword]));

    let failed = new_reauth_flow(&ctx.deps, UserId::new()).await;
    assert!(matches!(failed, Err(FlowError::NoUsableAuthenticationMethod)));
}
