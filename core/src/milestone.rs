//! Milestone capability probing.
//!
//! A milestone is a typed fact a node (or intent) asserts about the flow:
//! "an identity was selected", "the user authenticated with these AMR
//! values". Later logic queries facts by probing every entry in append
//! order instead of reading a rigid result schema, so new node kinds can
//! assert milestones without the querying code changing.
//!
//! Each probe has a default `None` implementation; a node overrides only
//! the facts it actually asserts.

use crate::authenticator::{AuthenticatorInfo, LockoutMethod};
use crate::config::AuthenticationMethod;
use crate::flow::{Flow, Node};
use crate::identity::IdentityInfo;
use crate::ids::UserId;
use crate::session::Amr;

/// Capability probes a node or intent may answer.
pub trait Milestone: Send + Sync {
    /// The identity selected or created by this entry.
    fn did_select_identity(&self) -> Option<&IdentityInfo> {
        None
    }

    /// The user this entry pinned the flow to.
    fn did_determine_user(&self) -> Option<UserId> {
        None
    }

    /// The authenticator this entry verified.
    fn did_select_authenticator(&self) -> Option<&AuthenticatorInfo> {
        None
    }

    /// AMR values asserted by this entry's authentication.
    fn did_authenticate(&self) -> Option<Vec<Amr>> {
        None
    }

    /// The lockout method the authentication counted toward.
    fn did_use_authentication_lockout_method(&self) -> Option<LockoutMethod> {
        None
    }

    /// The authentication method this entry selected.
    fn authentication_method(&self) -> Option<AuthenticationMethod> {
        None
    }
}

/// Probe every entry of `flow` in append order (sub-flows inline, depth
/// first), collecting all non-`None` answers to `probe`.
pub fn collect<T>(flow: &Flow, probe: impl Fn(&dyn Milestone) -> Option<T> + Copy) -> Vec<T> {
    let mut out = Vec::new();
    collect_into(flow, probe, &mut out);
    out
}

fn collect_into<T>(
    flow: &Flow,
    probe: impl Fn(&dyn Milestone) -> Option<T> + Copy,
    out: &mut Vec<T>,
) {
    if let Some(milestone) = flow.intent.milestone() {
        if let Some(value) = probe(milestone) {
            out.push(value);
        }
    }
    for node in &flow.nodes {
        match node {
            Node::Simple(simple) => {
                if let Some(milestone) = simple.milestone() {
                    if let Some(value) = probe(milestone) {
                        out.push(value);
                    }
                }
            }
            Node::SubFlow(sub) => collect_into(sub, probe, out),
        }
    }
}

/// The last non-`None` answer to `probe`, in append order.
pub fn find_last<T>(flow: &Flow, probe: impl Fn(&dyn Milestone) -> Option<T> + Copy) -> Option<T> {
    collect(flow, probe).pop()
}

/// The user the flow has been pinned to, if any entry determined one.
#[must_use]
pub fn determined_user(flow: &Flow) -> Option<UserId> {
    find_last(flow, |m| m.did_determine_user())
}

/// The identity selected or created by the flow, if any.
#[must_use]
pub fn selected_identity(flow: &Flow) -> Option<IdentityInfo> {
    find_last(flow, |m| m.did_select_identity().cloned())
}

/// All AMR values asserted by the flow, sorted and deduplicated, with
/// `mfa` appended when a secondary factor was used.
#[must_use]
pub fn collect_amr(flow: &Flow) -> Vec<Amr> {
    let mut amr: Vec<Amr> = collect(flow, |m| m.did_authenticate())
        .into_iter()
        .flatten()
        .collect();
    let used_secondary = collect(flow, |m| m.authentication_method())
        .into_iter()
        .any(AuthenticationMethod::is_secondary);
    if used_secondary {
        amr.push(Amr::Mfa);
    }
    amr.sort_unstable();
    amr.dedup();
    amr
}

/// Whether any entry authenticated with a lockout-applicable method.
#[must_use]
pub fn used_lockout_method(flow: &Flow) -> bool {
    !collect(flow, |m| m.did_use_authentication_lockout_method()).is_empty()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::deps::Dependencies;
    use crate::error::{FlowError, Result};
    use crate::input::{FlowInput, InputSchema};
    use crate::reactor::{FlowView, Intent, NodeSimple, ReactResult};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct InertIntent;

    #[async_trait]
    impl Intent for InertIntent {
        fn kind(&self) -> &'static str {
            "inert_intent"
        }

        fn data(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }

        async fn can_react_to(
            &self,
            _deps: &Dependencies,
            _flows: FlowView<'_>,
        ) -> Result<Option<Box<dyn InputSchema>>> {
            Err(FlowError::Eof)
        }

        async fn react_to(
            &self,
            _deps: &Dependencies,
            _flows: FlowView<'_>,
            _input: &FlowInput,
        ) -> Result<ReactResult> {
            Err(FlowError::IncompatibleInput)
        }
    }

    #[derive(Debug)]
    struct AuthenticatedNode {
        user_id: UserId,
        method: AuthenticationMethod,
        amr: Vec<Amr>,
        lockout: Option<LockoutMethod>,
    }

    impl Milestone for AuthenticatedNode {
        fn did_determine_user(&self) -> Option<UserId> {
            Some(self.user_id)
        }

        fn did_authenticate(&self) -> Option<Vec<Amr>> {
            Some(self.amr.clone())
        }

        fn did_use_authentication_lockout_method(&self) -> Option<LockoutMethod> {
            self.lockout
        }

        fn authentication_method(&self) -> Option<AuthenticationMethod> {
            Some(self.method)
        }
    }

    #[async_trait]
    impl NodeSimple for AuthenticatedNode {
        fn kind(&self) -> &'static str {
            "authenticated_node"
        }

        fn data(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }

        fn milestone(&self) -> Option<&dyn Milestone> {
            Some(self)
        }
    }

    fn two_factor_flow() -> (Flow, UserId, UserId) {
        let first = UserId::new();
        let second = UserId::new();
        let mut flow = Flow::new(Box::new(InertIntent));
        flow.nodes.push(Node::Simple(Box::new(AuthenticatedNode {
            user_id: first,
            method: AuthenticationMethod::PrimaryPassword,
            amr: vec![Amr::Pwd],
            lockout: Some(LockoutMethod::Password),
        })));
        let mut sub = Flow::new(Box::new(InertIntent));
        sub.nodes.push(Node::Simple(Box::new(AuthenticatedNode {
            user_id: second,
            method: AuthenticationMethod::SecondaryTotp,
            amr: vec![Amr::Otp],
            lockout: None,
        })));
        flow.nodes.push(Node::SubFlow(sub));
        (flow, first, second)
    }

    #[test]
    fn probes_reach_nested_sub_flows_in_append_order() {
        let (flow, _, second) = two_factor_flow();
        let methods = collect(&flow, |m| m.authentication_method());
        assert_eq!(
            methods,
            vec![
                AuthenticationMethod::PrimaryPassword,
                AuthenticationMethod::SecondaryTotp,
            ]
        );
        assert_eq!(determined_user(&flow), Some(second));
    }

    #[test]
    fn amr_gains_mfa_when_a_secondary_factor_answered() {
        let (flow, _, _) = two_factor_flow();
        assert_eq!(collect_amr(&flow), vec![Amr::Pwd, Amr::Otp, Amr::Mfa]);
    }

    #[test]
    fn lockout_method_use_is_visible_from_the_root() {
        let (flow, _, _) = two_factor_flow();
        assert!(used_lockout_method(&flow));

        let empty = Flow::new(Box::new(InertIntent));
        assert!(!used_lockout_method(&empty));
        assert_eq!(determined_user(&empty), None);
        assert!(collect_amr(&empty).is_empty());
    }
}
