//! # Authflow Core
//!
//! The authentication flow engine: resumable, server-driven state
//! machines whose state *is* a typed graph of executed steps.
//!
//! ## Core Concepts
//!
//! - **Intent**: a decision point that owns a (sub-)flow and decides
//!   what happens next
//! - **Node**: an appended entry — either a settled fact
//!   ([`NodeSimple`]) or a nested sub-flow with its own intent
//! - **Input reactor**: derived on demand by walking the graph; the
//!   entry that accepts the next client input
//! - **Milestone**: capability probes over executed entries, replacing
//!   out-of-band flags with evidence already in the graph
//! - **Effect**: deferred side-effect descriptors, applied only when a
//!   finished flow is finalized
//!
//! ## Architecture Principles
//!
//! - Append-only graph growth; reactions never rewrite history
//! - Speculation is free: deriving edges or output data mutates nothing
//! - Polymorphic persistence through an explicit kind registry
//! - Optimistic concurrency between clients racing on one instance
//!
//! Flow definitions themselves (login, signup, reauthentication) live
//! in the companion `authflow-declarative` crate; this crate knows
//! nothing about any concrete flow.

pub mod authenticator;
pub mod config;
pub mod deps;
pub mod effect;
pub mod error;
pub mod event;
pub mod flow;
pub mod identity;
pub mod ids;
pub mod input;
pub mod milestone;
pub mod reactor;
pub mod registry;
pub mod response;
pub mod session;
pub mod store;
pub mod traversal;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

pub use authenticator::{
    AuthenticatorFilter, AuthenticatorInfo, AuthenticatorKind, AuthenticatorSpec,
    AuthenticatorType, LockoutMethod, VerifyResult,
};
pub use config::{
    AuthenticationBranch, AuthenticationMethod, FlowConfig, FlowPointer, FlowStepConfig, FlowType,
    FlowsConfig, Identification, IdentificationBranch, OtpConfig, PointerSegment,
};
pub use deps::{
    AuthenticatorStore, Clock, Dependencies, EventSink, IdentityStore, LockoutService, OtpChannel,
    OtpForm, OtpPurpose, OtpService, OtpState, PasskeyService, RecoveryCodeStore, SessionService,
    SystemClock, UserStore,
};
pub use effect::{apply_effects, collect_effects, finalize, Effect, FinalizeResult};
pub use error::{FlowError, Result};
pub use event::FlowEvent;
pub use flow::{Flow, FlowInstance, Node};
pub use identity::{IdentityInfo, IdentityType, LoginIdSpec, LoginIdType};
pub use ids::{AuthenticatorId, FlowId, IdentityId, SessionId, UserId};
pub use input::{validate_as, FlowActionType, FlowInput, InputSchema};
pub use milestone::Milestone;
pub use reactor::{FlowView, Intent, Kinded, NodeSimple, ReactResult};
pub use registry::FlowRegistry;
pub use response::{FlowAction, FlowResponse};
pub use session::{Amr, Session, SessionAttrs};
pub use store::{FlowRecord, FlowStore, MemoryFlowStore, Revision};
pub use traversal::{accept, advance, find_input_reactor, InputReactorLocation, ReactorRef};
