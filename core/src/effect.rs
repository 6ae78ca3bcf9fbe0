//! Deferred side effects.
//!
//! Reacting to input never touches external write paths directly. Nodes
//! and intents instead describe what should happen as [`Effect`]
//! descriptors, collected by [`collect_effects`] and applied by
//! [`finalize`] once — and only once — the flow has reached its terminal
//! state. Speculative inspection (edge derivation, output data, UI
//! rendering) therefore never mutates anything, including for flows that
//! are ultimately abandoned.

use crate::authenticator::AuthenticatorInfo;
use crate::deps::Dependencies;
use crate::error::{FlowError, Result};
use crate::event::FlowEvent;
use crate::flow::{Flow, FlowInstance, Node};
use crate::identity::IdentityInfo;
use crate::ids::{IdentityId, UserId};
use crate::reactor::{FlowView, Intent, NodeSimple};
use crate::session::{Session, SessionAttrs};
use crate::traversal;

/// A deferred side effect, applied at commit in append order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist a new user record.
    CreateUser {
        /// The user to create.
        user_id: UserId,
    },
    /// Persist a new identity.
    CreateIdentity {
        /// The identity to create.
        identity: IdentityInfo,
    },
    /// Persist a new authenticator.
    CreateAuthenticator {
        /// The authenticator to create.
        authenticator: AuthenticatorInfo,
    },
    /// Record an out-of-band claim verification.
    MarkClaimVerified {
        /// The identity whose claim was verified.
        identity_id: IdentityId,
    },
    /// Issue a session.
    CreateSession {
        /// Attributes for the new session.
        attrs: SessionAttrs,
    },
    /// Reset the lockout counter after a successful authentication.
    ClearLockoutAttempts {
        /// The user whose counter resets.
        user_id: UserId,
    },
    /// Dispatch an audit/webhook event.
    DispatchEvent {
        /// The event to dispatch.
        event: FlowEvent,
    },
}

/// Outcome of committing a finished flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeResult {
    /// The session issued by the flow, if any.
    pub session: Option<Session>,
    /// How many effects were applied.
    pub applied: usize,
}

enum EntryRef<'a> {
    Intent(&'a dyn Intent),
    Node(&'a dyn NodeSimple),
}

/// Walk entries in append order: each flow's nodes first (sub-flows
/// inline), then its owning intent.
fn walk<'a>(root: &'a Flow, flow: &'a Flow, out: &mut Vec<(FlowView<'a>, EntryRef<'a>)>) {
    for node in &flow.nodes {
        match node {
            Node::Simple(simple) => {
                out.push((FlowView { root, nearest: flow }, EntryRef::Node(simple.as_ref())));
            }
            Node::SubFlow(sub) => walk(root, sub, out),
        }
    }
    out.push((FlowView { root, nearest: flow }, EntryRef::Intent(flow.intent.as_ref())));
}

/// Collect every pending effect of `instance` in application order.
///
/// # Errors
///
/// Propagates any error from the entries' `effects` implementations.
pub async fn collect_effects(deps: &Dependencies, instance: &FlowInstance) -> Result<Vec<Effect>> {
    let mut entries = Vec::new();
    walk(&instance.root, &instance.root, &mut entries);

    let mut effects = Vec::new();
    for (view, entry) in entries {
        let batch = match entry {
            EntryRef::Intent(intent) => intent.effects(deps, view).await?,
            EntryRef::Node(node) => node.effects(deps, view).await?,
        };
        effects.extend(batch);
    }
    Ok(effects)
}

/// Apply collected effects through the external collaborators.
///
/// # Errors
///
/// Propagates the first collaborator failure; earlier effects stay
/// applied (the committer is not transactional — collaborators are
/// expected to tolerate re-commit of an already-applied effect).
pub async fn apply_effects(deps: &Dependencies, effects: &[Effect]) -> Result<Option<Session>> {
    let mut session = None;
    for effect in effects {
        match effect {
            Effect::CreateUser { user_id } => deps.users.create(*user_id).await?,
            Effect::CreateIdentity { identity } => deps.identities.create(identity).await?,
            Effect::CreateAuthenticator { authenticator } => {
                deps.authenticators.create(authenticator).await?;
            }
            Effect::MarkClaimVerified { identity_id } => {
                deps.identities.mark_claim_verified(*identity_id).await?;
            }
            Effect::CreateSession { attrs } => {
                session = Some(deps.sessions.create(attrs).await?);
            }
            Effect::ClearLockoutAttempts { user_id } => {
                deps.lockout.clear_failed_attempts(*user_id).await?;
            }
            Effect::DispatchEvent { event } => deps.events.dispatch(event).await?,
        }
    }
    Ok(session)
}

/// Commit a finished flow: collect its effects and apply them.
///
/// # Errors
///
/// Returns [`FlowError::Internal`] when the flow still accepts input —
/// finalizing is only legal once `accept` has signalled
/// [`FlowError::Eof`].
pub async fn finalize(deps: &Dependencies, instance: &FlowInstance) -> Result<FinalizeResult> {
    match traversal::find_input_reactor(deps, &instance.root).await {
        Err(FlowError::Eof) => {}
        Err(err) => return Err(err),
        Ok(_) => {
            return Err(FlowError::Internal("flow is not finished; it still accepts input".into()));
        }
    }

    let effects = collect_effects(deps, instance).await?;
    let applied = effects.len();
    let session = apply_effects(deps, &effects).await?;
    tracing::info!(
        flow_id = %instance.id,
        flow_type = instance.flow_type.as_str(),
        applied,
        session_issued = session.is_some(),
        "flow finalized"
    );
    Ok(FinalizeResult { session, applied })
}
