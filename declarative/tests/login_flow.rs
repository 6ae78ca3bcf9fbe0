//! Integration tests for the configured login flow.

use authflow_core::authenticator::{AuthenticatorKind, AuthenticatorType, LockoutMethod};
use authflow_core::config::{
    AuthenticationBranch, AuthenticationMethod, FlowConfig, FlowStepConfig, FlowType, FlowsConfig,
    Identification, IdentificationBranch, OtpConfig,
};
use authflow_core::deps::OtpPurpose;
use authflow_core::effect::finalize;
use authflow_core::error::FlowError;
use authflow_core::event::FlowEvent;
use authflow_core::flow::FlowInstance;
use authflow_core::identity::{IdentityInfo, LoginIdType};
use authflow_core::ids::UserId;
use authflow_core::input::FlowActionType;
use authflow_core::response::FlowResponse;
use authflow_core::session::Amr;
use authflow_core::traversal::{accept, find_input_reactor, reactor_output_data};
use authflow_declarative::mask::mask_email;
use authflow_declarative::mocks::TestContext;
use authflow_declarative::{default_registry, new_login_flow};
use serde_json::json;

const EMAIL: &str = "jane@example.com";

fn identify_branch(identification: Identification) -> IdentificationBranch {
    IdentificationBranch { identification, steps: vec![] }
}

fn authenticate(methods: &[AuthenticationMethod]) -> FlowStepConfig {
    FlowStepConfig::Authenticate {
        one_of: methods
            .iter()
            .map(|&authentication| AuthenticationBranch { authentication, steps: vec![] })
            .collect(),
    }
}

fn login_config(steps: Vec<FlowStepConfig>) -> FlowsConfig {
    FlowsConfig {
        login: FlowConfig { name: "default".into(), steps },
        signup: FlowConfig { name: "default".into(), steps: vec![] },
        reauth: FlowConfig { name: "default".into(), steps: vec![] },
        anonymous_users_enabled: false,
        otp: OtpConfig::default(),
    }
}

fn password_login_config() -> FlowsConfig {
    login_config(vec![
        FlowStepConfig::Identify {
            one_of: vec![
                identify_branch(Identification::Email),
                identify_branch(Identification::Username),
            ],
        },
        authenticate(&[
            AuthenticationMethod::PrimaryPassword,
            AuthenticationMethod::PrimaryOobOtpEmail,
        ]),
    ])
}

fn seed_user(ctx: &TestContext, email: &str) -> UserId {
    let user_id = UserId::new();
    ctx.identities.seed(IdentityInfo::new_login_id(user_id, LoginIdType::Email, email));
    user_id
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn password_login_issues_session() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

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

    // Successful verification clears the failure counter immediately, and
    // the commit resets it once more for the whole bracket.
    assert_eq!(ctx.lockout.clear_calls(), 2);
    assert!(ctx
        .events
        .dispatched()
        .iter()
        .any(|e| matches!(e, FlowEvent::UserAuthenticated { user_id: id, .. } if *id == user_id)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn identification_options_are_published() {
    let ctx = TestContext::new(password_login_config());
    let instance = new_login_flow(&ctx.deps).await.unwrap();

    let location = find_input_reactor(&ctx.deps, &instance.root).await.unwrap();
    let data = reactor_output_data(&ctx.deps, &instance.root, &location).await.unwrap().unwrap();
    assert_eq!(data, json!({ "options": ["email", "username"] }));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn response_envelope_tracks_the_wait_point() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    let location = find_input_reactor(&ctx.deps, &instance.root).await.unwrap();
    let response = FlowResponse::at_reactor(&ctx.deps, &instance, &location).await.unwrap();
    assert_eq!(response.id, instance.id);
    assert_eq!(response.flow_type, FlowType::Login);
    assert_eq!(response.name, "default");
    assert_eq!(response.action.action_type, FlowActionType::Identify);
    assert_eq!(response.action.data, Some(json!({ "options": ["email", "username"] })));

    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();
    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let finished = FlowResponse::finished(&instance, None);
    assert_eq!(finished.action.action_type, FlowActionType::Finished);
    let body = serde_json::to_value(&finished).unwrap();
    assert_eq!(body["action"]["type"], json!("finished"));
    assert!(body["action"].get("data").is_none());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn authentication_options_exclude_unusable_methods() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");
    // No OOB authenticator, so primary_oob_otp_email is not usable.

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    let location = find_input_reactor(&ctx.deps, &instance.root).await.unwrap();
    let data = reactor_output_data(&ctx.deps, &instance.root, &location).await.unwrap().unwrap();
    assert_eq!(data, json!({ "options": [{ "authentication": "primary_password" }] }));

    let rejected = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_oob_otp_email", "code": "000000" }),
    )
    .await;
    match rejected {
        Err(FlowError::InvalidAuthenticationMethod { allowed, actual }) => {
            assert_eq!(allowed, vec!["primary_password".to_string()]);
            assert_eq!(actual, "primary_oob_otp_email");
        }
        other => panic!("expected InvalidAuthenticationMethod, got {other:?}"),
    }
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn wrong_password_leaves_flow_position_unchanged() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();
    let len_before = instance.root.total_len();

    for _ in 0..3 {
        let rejected = accept(
            &ctx.deps,
            &mut instance,
            &json!({ "authentication": "primary_password", "password": "wrong" }),
        )
        .await;
        assert!(matches!(rejected, Err(FlowError::InvalidCredentials)));
    }

    assert_eq!(instance.root.total_len(), len_before);
    assert_eq!(ctx.lockout.record_calls(), 3);
    assert_eq!(ctx.lockout.failed_attempts(user_id, LockoutMethod::Password), 3);

    // The flow is still at the same wait point and accepts the correct
    // password.
    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn malformed_input_is_rejected_before_verification() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    // Missing the authentication discriminator entirely.
    let rejected = accept(&ctx.deps, &mut instance, &json!({ "password": "hunter2" })).await;
    assert!(matches!(rejected, Err(FlowError::IncompatibleInput)));
    assert_eq!(ctx.lockout.check_calls(), 0);
    assert_eq!(ctx.lockout.record_calls(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn repeated_failures_lock_the_account() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");
    ctx.lockout.set_threshold(2);

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    for _ in 0..2 {
        let rejected = accept(
            &ctx.deps,
            &mut instance,
            &json!({ "authentication": "primary_password", "password": "wrong" }),
        )
        .await;
        assert!(matches!(rejected, Err(FlowError::InvalidCredentials)));
    }

    // The lockout check now fails before the stored secret is consulted,
    // even with the correct password.
    let locked = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await;
    assert!(matches!(locked, Err(FlowError::AccountLocked)));
    assert_eq!(ctx.lockout.failed_attempts(user_id, LockoutMethod::Password), 2);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn unknown_login_id_is_rejected() {
    let ctx = TestContext::new(password_login_config());

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    let rejected = accept(&ctx.deps, &mut instance, &json!({ "login_id": "nobody@example.com" })).await;
    assert!(matches!(rejected, Err(FlowError::UserNotFound)));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn anonymous_identification_requires_enablement() {
    // Anonymous is configured as a branch but globally disabled.
    let ctx = TestContext::new(login_config(vec![
        FlowStepConfig::Identify {
            one_of: vec![
                identify_branch(Identification::Email),
                identify_branch(Identification::Anonymous),
            ],
        },
        authenticate(&[AuthenticationMethod::PrimaryPassword]),
    ]));

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    let len_before = instance.root.total_len();
    let rejected = accept(&ctx.deps, &mut instance, &json!({ "identification": "anonymous" })).await;
    assert!(matches!(rejected, Err(FlowError::ConfigurationViolated { .. })));
    assert_eq!(instance.root.total_len(), len_before);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn oob_otp_login_with_resend() {
    let ctx = TestContext::new(login_config(vec![
        FlowStepConfig::Identify { one_of: vec![identify_branch(Identification::Email)] },
        authenticate(&[AuthenticationMethod::PrimaryOobOtpEmail]),
    ]));
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_oob(
        user_id,
        AuthenticatorKind::Primary,
        AuthenticatorType::OobOtpEmail,
        EMAIL,
    );

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    // Options carry the masked delivery target.
    let location = find_input_reactor(&ctx.deps, &instance.root).await.unwrap();
    let data = reactor_output_data(&ctx.deps, &instance.root, &location).await.unwrap().unwrap();
    assert_eq!(
        data,
        json!({ "options": [{
            "authentication": "primary_oob_otp_email",
            "masked_display_name": mask_email(EMAIL),
        }] })
    );

    // Selecting the method sends the first code.
    accept(&ctx.deps, &mut instance, &json!({ "authentication": "primary_oob_otp_email" }))
        .await
        .unwrap();
    assert_eq!(ctx.otp.sent().len(), 1);
    let len_waiting = instance.root.total_len();

    // Resend delivers a fresh code without growing the graph.
    accept(&ctx.deps, &mut instance, &json!({ "resend": true })).await.unwrap();
    assert_eq!(ctx.otp.sent().len(), 2);
    assert_eq!(instance.root.total_len(), len_waiting);

    // The latest code verifies.
    let code = ctx.otp.last_code(EMAIL, OtpPurpose::Authenticate).unwrap();
    let terminal = accept(&ctx.deps, &mut instance, &json!({ "code": code })).await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    assert_eq!(result.session.unwrap().amr, vec![Amr::Otp]);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn output_data_is_idempotent() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();
    let len_before = instance.root.total_len();

    let location = find_input_reactor(&ctx.deps, &instance.root).await.unwrap();
    let first = reactor_output_data(&ctx.deps, &instance.root, &location).await.unwrap();
    let second = reactor_output_data(&ctx.deps, &instance.root, &location).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(instance.root.total_len(), len_before);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn flow_graph_grows_monotonically() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    let mut last_len = instance.root.total_len();

    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();
    assert!(instance.root.total_len() >= last_len);
    last_len = instance.root.total_len();

    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));
    assert!(instance.root.total_len() >= last_len);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn mid_flow_snapshot_rehydrates() {
    let ctx = TestContext::new(password_login_config());
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    let snapshot = instance.to_json().unwrap();
    let registry = default_registry();
    let mut rehydrated = FlowInstance::from_json(&registry, &snapshot).unwrap();
    assert_eq!(rehydrated.id, instance.id);
    assert_eq!(rehydrated.root.total_len(), instance.root.total_len());

    // The rehydrated instance continues exactly where the original waited.
    let terminal = accept(
        &ctx.deps,
        &mut rehydrated,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let result = finalize(&ctx.deps, &rehydrated).await.unwrap();
    assert_eq!(result.session.unwrap().user_id, user_id);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn passkey_login_skips_lockout_bookkeeping() {
    let ctx = TestContext::new(login_config(vec![
        FlowStepConfig::Identify { one_of: vec![identify_branch(Identification::Email)] },
        authenticate(&[AuthenticationMethod::PrimaryPasskey]),
    ]));
    let user_id = seed_user(&ctx, EMAIL);
    let assertion = json!({ "credential_id": "abc", "signature": "sig" });
    let info = ctx.authenticators.seed_passkey(user_id);
    ctx.passkeys.register(user_id, assertion.clone(), info);

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_passkey", "assertion": assertion }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    // Phishing-resistant methods bypass the lockout service entirely.
    assert_eq!(ctx.lockout.check_calls(), 0);
    assert_eq!(ctx.lockout.record_calls(), 0);

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    assert_eq!(result.session.unwrap().amr, vec![Amr::HwK]);
    // No lockout bracket was opened, so the commit has nothing to reset.
    assert_eq!(ctx.lockout.clear_calls(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn second_factor_totp_adds_mfa() {
    let ctx = TestContext::new(login_config(vec![
        FlowStepConfig::Identify { one_of: vec![identify_branch(Identification::Email)] },
        FlowStepConfig::Authenticate {
            one_of: vec![AuthenticationBranch {
                authentication: AuthenticationMethod::PrimaryPassword,
                steps: vec![authenticate(&[AuthenticationMethod::SecondaryTotp])],
            }],
        },
    ]));
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");
    ctx.authenticators.seed_totp(user_id, "246810");

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();
    accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "primary_password", "password": "hunter2" }),
    )
    .await
    .unwrap();

    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "secondary_totp", "code": "246810" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    assert_eq!(result.session.unwrap().amr, vec![Amr::Pwd, Amr::Otp, Amr::Mfa]);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn recovery_code_is_consumed_on_use() {
    let ctx = TestContext::new(login_config(vec![
        FlowStepConfig::Identify { one_of: vec![identify_branch(Identification::Email)] },
        authenticate(&[
            AuthenticationMethod::PrimaryPassword,
            AuthenticationMethod::RecoveryCode,
        ]),
    ]));
    let user_id = seed_user(&ctx, EMAIL);
    ctx.authenticators.seed_password(user_id, AuthenticatorKind::Primary, "hunter2");
    ctx.recovery_codes.seed(user_id, &["AAAA-BBBB", "CCCC-DDDD"]);

    let mut instance = new_login_flow(&ctx.deps).await.unwrap();
    accept(&ctx.deps, &mut instance, &json!({ "login_id": EMAIL })).await.unwrap();

    let terminal = accept(
        &ctx.deps,
        &mut instance,
        &json!({ "authentication": "recovery_code", "recovery_code": "AAAA-BBBB" }),
    )
    .await;
    assert!(matches!(terminal, Err(FlowError::Eof)));
    assert_eq!(ctx.recovery_codes.remaining(user_id), vec!["CCCC-DDDD".to_string()]);

    let result = finalize(&ctx.deps, &instance).await.unwrap();
    assert_eq!(result.session.unwrap().amr, vec![Amr::Mfa, Amr::RecoveryCode]);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn finalize_refuses_a_waiting_flow() {
    let ctx = TestContext::new(password_login_config());
    let instance = new_login_flow(&ctx.deps).await.unwrap();

    let premature = finalize(&ctx.deps, &instance).await;
    assert!(matches!(premature, Err(FlowError::Internal(_))));
    assert!(ctx.sessions.created().is_empty());
    assert!(ctx.events.dispatched().is_empty());
}
