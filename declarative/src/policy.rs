//! Step policy: which branches of a configured step the current user
//! can actually take.
//!
//! Derivations here are re-run on every inspection from the graph and
//! the live stores, never cached in flow state, so configuration changes
//! and authenticator changes take effect on resumed flows immediately.

use std::sync::LazyLock;

use authflow_core::authenticator::{
    apply_filters, keep_kind, keep_matching_identity, keep_type, AuthenticatorFilter,
    AuthenticatorInfo, AuthenticatorKind, AuthenticatorType, LockoutMethod,
};
use authflow_core::config::{
    AuthenticationBranch, AuthenticationMethod, FlowConfig, FlowPointer, FlowStepConfig,
    Identification, PointerSegment,
};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::flow::Flow;
use authflow_core::identity::IdentityInfo;
use authflow_core::ids::UserId;
use authflow_core::milestone;
use regex::Regex;

use crate::mask::{mask_email, mask_phone};
use crate::output::AuthenticationOption;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
});

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\+[0-9]{6,15}$").unwrap()
});

/// Classify a raw login ID against the identification methods a step
/// offers, most specific first: email, then phone, then username as the
/// free-form fallback.
#[must_use]
pub fn classify_login_id(options: &[Identification], login_id: &str) -> Option<Identification> {
    if options.contains(&Identification::Email) && EMAIL_PATTERN.is_match(login_id) {
        return Some(Identification::Email);
    }
    if options.contains(&Identification::Phone) && PHONE_PATTERN.is_match(login_id) {
        return Some(Identification::Phone);
    }
    if options.contains(&Identification::Username) {
        return Some(Identification::Username);
    }
    None
}

/// An authentication branch the current user can take, with the stored
/// authenticators backing it.
#[derive(Debug, Clone)]
pub struct UsableMethod {
    /// The branch's method.
    pub method: AuthenticationMethod,
    /// Authenticators usable for it. Empty for recovery codes, which are
    /// not backed by stored authenticators.
    pub authenticators: Vec<AuthenticatorInfo>,
}

/// Derive the usable subset of an authenticate step's branches.
///
/// A branch is usable when the user owns at least one authenticator of
/// its kind and type; for primary OOB-OTP branches the authenticator's
/// delivery target must additionally equal the selected identity's
/// login-ID claim. Recovery-code branches are always offered.
///
/// # Errors
///
/// Returns [`FlowError::Internal`] when no entry has determined a user
/// yet; authenticate steps cannot run before identification.
pub async fn usable_authentication_methods(
    deps: &Dependencies,
    root: &Flow,
    one_of: &[AuthenticationBranch],
) -> Result<Vec<UsableMethod>> {
    let user_id = determined_user(root)?;
    let identity = milestone::selected_identity(root);

    let mut usable = Vec::new();
    for branch in one_of {
        let method = branch.authentication;
        let (Some(kind), Some(r#type)) = (method.authenticator_kind(), method.authenticator_type())
        else {
            // Recovery codes have no stored authenticator to check.
            usable.push(UsableMethod { method, authenticators: Vec::new() });
            continue;
        };

        let authenticators = list_for_method(deps, user_id, kind, r#type, identity.as_ref()).await?;
        if !authenticators.is_empty() {
            usable.push(UsableMethod { method, authenticators });
        }
    }
    Ok(usable)
}

async fn list_for_method(
    deps: &Dependencies,
    user_id: UserId,
    kind: AuthenticatorKind,
    r#type: AuthenticatorType,
    identity: Option<&IdentityInfo>,
) -> Result<Vec<AuthenticatorInfo>> {
    let by_kind = keep_kind(kind);
    let by_type = keep_type(r#type);
    let listed = deps.authenticators.list(user_id, &[&by_kind, &by_type]).await?;

    let oob = matches!(r#type, AuthenticatorType::OobOtpEmail | AuthenticatorType::OobOtpSms);
    if oob && kind == AuthenticatorKind::Primary {
        if let Some(identity) = identity.filter(|i| i.login_id.is_some()) {
            let matching = keep_matching_identity(identity);
            let filters: [&dyn AuthenticatorFilter; 1] = [&matching];
            return Ok(apply_filters(listed, &filters));
        }
    }
    Ok(listed)
}

/// Project usable methods into client-facing options.
#[must_use]
pub fn authentication_options(methods: &[UsableMethod]) -> Vec<AuthenticationOption> {
    methods
        .iter()
        .map(|usable| AuthenticationOption {
            authentication: usable.method,
            masked_display_name: usable.authenticators.first().and_then(masked_target),
        })
        .collect()
}

fn masked_target(info: &AuthenticatorInfo) -> Option<String> {
    let target = info.oob_target.as_deref()?;
    match info.r#type {
        AuthenticatorType::OobOtpEmail => Some(mask_email(target)),
        AuthenticatorType::OobOtpSms => Some(mask_phone(target)),
        _ => None,
    }
}

/// The error returned when a submitted method is not in the usable set.
#[must_use]
pub fn invalid_method(usable: &[UsableMethod], actual: AuthenticationMethod) -> FlowError {
    FlowError::InvalidAuthenticationMethod {
        allowed: usable.iter().map(|u| u.method.as_str().to_string()).collect(),
        actual: actual.as_str().to_string(),
    }
}

/// The user the flow has been pinned to.
///
/// # Errors
///
/// Returns [`FlowError::Internal`] when no entry determined one; steps
/// that call this can only appear after identification.
pub fn determined_user(root: &Flow) -> Result<UserId> {
    milestone::determined_user(root)
        .ok_or_else(|| FlowError::Internal("no entry has determined a user yet".into()))
}

/// Resolve the list of steps a steps-executor intent runs: the flow's
/// top-level steps for the root pointer, or the nested steps of the
/// branch the pointer addresses.
///
/// # Errors
///
/// Returns [`FlowError::MalformedState`] when the pointer addresses
/// neither the root nor a branch, which indicates config/state skew.
pub fn steps_at<'a>(config: &'a FlowConfig, pointer: &FlowPointer) -> Result<&'a [FlowStepConfig]> {
    let segments = pointer.segments();
    let Some((last, prefix)) = segments.split_last() else {
        return Ok(&config.steps);
    };
    match *last {
        PointerSegment::OneOf(branch) => {
            let prefix = prefix.iter().fold(FlowPointer::root(), |p, segment| match *segment {
                PointerSegment::Steps(i) => p.step(i),
                PointerSegment::OneOf(i) => p.one_of(i),
            });
            prefix.resolve_branch_steps(config, branch)
        }
        PointerSegment::Steps(_) => Err(FlowError::MalformedState {
            reason: format!("pointer {pointer} does not address a steps list"),
        }),
    }
}

/// Check the lockout state before a credential verification, for methods
/// that fall under lockout.
///
/// # Errors
///
/// Returns [`FlowError::AccountLocked`] while the user is locked out.
pub async fn guard_verification(
    deps: &Dependencies,
    user_id: UserId,
    lockout: Option<LockoutMethod>,
) -> Result<()> {
    if let Some(method) = lockout {
        deps.lockout.check(user_id, method).await?;
    }
    Ok(())
}

/// Settle a verification outcome against the lockout service: failures
/// count one attempt, successes clear the counter.
///
/// # Errors
///
/// Returns the original `outcome` error after bookkeeping, or a lockout
/// service error.
pub async fn settle_verification<T>(
    deps: &Dependencies,
    user_id: UserId,
    lockout: Option<LockoutMethod>,
    outcome: Result<T>,
) -> Result<T> {
    let Some(method) = lockout else { return outcome };
    match outcome {
        Ok(value) => {
            deps.lockout.clear_failed_attempts(user_id).await?;
            Ok(value)
        }
        Err(err @ (FlowError::InvalidCredentials | FlowError::InvalidOtpCode)) => {
            deps.lockout.record_failed_attempt(user_id, method).await?;
            Err(err)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_wins_over_username() {
        let options =
            [Identification::Email, Identification::Phone, Identification::Username];
        assert_eq!(
            classify_login_id(&options, "jane@example.com"),
            Some(Identification::Email)
        );
        assert_eq!(classify_login_id(&options, "+85298765432"), Some(Identification::Phone));
        assert_eq!(classify_login_id(&options, "jane"), Some(Identification::Username));
    }

    #[test]
    fn classification_respects_allowed_set() {
        let email_only = [Identification::Email];
        assert_eq!(classify_login_id(&email_only, "jane"), None);
        // Without username as a fallback, a phone-shaped value is still
        // a phone, nothing else.
        assert_eq!(classify_login_id(&email_only, "+85298765432"), None);
    }

    #[test]
    fn nested_pointer_resolves_branch_steps() {
        let config = FlowConfig {
            name: "default".into(),
            steps: vec![FlowStepConfig::Authenticate {
                one_of: vec![AuthenticationBranch {
                    authentication: AuthenticationMethod::PrimaryPassword,
                    steps: vec![FlowStepConfig::Verify],
                }],
            }],
        };
        let pointer = FlowPointer::root().step(0).one_of(0);
        #[allow(clippy::unwrap_used)]
        let steps = steps_at(&config, &pointer).unwrap();
        assert_eq!(steps, &[FlowStepConfig::Verify]);
        assert!(matches!(
            steps_at(&config, &FlowPointer::root().step(0)),
            Err(FlowError::MalformedState { .. })
        ));
    }
}
