//! Input-reactor location and the accept loop.
//!
//! The current wait point of a flow is never stored; it is derived from
//! the graph on demand. [`find_input_reactor`] descends the chain of
//! trailing sub-flows to the deepest open flow and asks candidates,
//! innermost outwards, whether they still react. [`accept`] drives the
//! flow forward, auto-advancing through reactors that need no input and
//! consuming the supplied client input at most once.

use crate::deps::Dependencies;
use crate::error::{FlowError, Result};
use crate::flow::{Flow, FlowInstance, Node};
use crate::input::{FlowInput, InputSchema};
use crate::reactor::{FlowView, ReactResult};

/// Where in the graph the located reactor sits.
///
/// `depth` counts trailing sub-flow hops from the root: the root flow is
/// depth 0, its trailing sub-flow depth 1, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorRef {
    /// The last simple node of the flow at the given depth.
    NodeAt(usize),
    /// The intent owning the flow at the given depth.
    IntentAt(usize),
}

impl ReactorRef {
    const fn depth(self) -> usize {
        match self {
            Self::NodeAt(depth) | Self::IntentAt(depth) => depth,
        }
    }
}

/// The reactor that currently owns the flow's wait point.
pub struct InputReactorLocation {
    /// Which entry reacts.
    pub reactor: ReactorRef,
    /// `Some` when the reactor waits for client input, `None` when it
    /// advances on its own.
    pub schema: Option<Box<dyn InputSchema>>,
}

/// Follow trailing sub-flow nodes from `root` down to the given depth.
fn flow_at(root: &Flow, depth: usize) -> &Flow {
    let mut flow = root;
    for _ in 0..depth {
        match flow.nodes.last() {
            Some(Node::SubFlow(sub)) => flow = sub,
            _ => break,
        }
    }
    flow
}

/// Push `node` onto the flow `depth` trailing sub-flows below `flow`,
/// or onto the deepest trailing sub-flow if the chain is shorter.
fn push_at(flow: &mut Flow, depth: usize, node: Node) {
    if depth > 0 {
        if let Some(Node::SubFlow(sub)) = flow.nodes.last_mut() {
            return push_at(sub, depth - 1, node);
        }
    }
    flow.nodes.push(node);
}

fn deepest_depth(root: &Flow) -> usize {
    let mut depth = 0;
    let mut flow = root;
    while let Some(Node::SubFlow(sub)) = flow.nodes.last() {
        depth += 1;
        flow = sub;
    }
    depth
}

/// Locate the entry that reacts to the next input.
///
/// Candidates at the deepest flow are its last simple node (nodes may be
/// reactive) and then its owning intent; outer flows contribute their
/// intents only. The first candidate that does not signal
/// [`FlowError::Eof`] wins.
///
/// # Errors
///
/// Returns [`FlowError::Eof`] when every candidate is closed — the flow
/// is terminal. Any other candidate error propagates unchanged.
pub async fn find_input_reactor(
    deps: &Dependencies,
    root: &Flow,
) -> Result<InputReactorLocation> {
    let deepest = deepest_depth(root);
    for depth in (0..=deepest).rev() {
        let flow = flow_at(root, depth);
        let view = FlowView { root, nearest: flow };

        if let Some(Node::Simple(node)) = flow.nodes.last() {
            match node.can_react_to(deps, view).await {
                Ok(schema) => {
                    return Ok(InputReactorLocation { reactor: ReactorRef::NodeAt(depth), schema });
                }
                Err(FlowError::Eof) => {}
                Err(err) => return Err(err),
            }
        }

        match flow.intent.can_react_to(deps, view).await {
            Ok(schema) => {
                return Ok(InputReactorLocation { reactor: ReactorRef::IntentAt(depth), schema });
            }
            Err(FlowError::Eof) => {}
            Err(err) => return Err(err),
        }
    }
    Err(FlowError::Eof)
}

/// Ask the located reactor for its presentation data.
///
/// # Errors
///
/// Propagates the reactor's `output_data` error.
pub async fn reactor_output_data(
    deps: &Dependencies,
    root: &Flow,
    location: &InputReactorLocation,
) -> Result<Option<serde_json::Value>> {
    let flow = flow_at(root, location.reactor.depth());
    let view = FlowView { root, nearest: flow };
    match location.reactor {
        ReactorRef::NodeAt(_) => match flow.nodes.last() {
            Some(Node::Simple(node)) => node.output_data(deps, view).await,
            _ => Ok(None),
        },
        ReactorRef::IntentAt(_) => flow.intent.output_data(deps, view).await,
    }
}

async fn react_at(
    deps: &Dependencies,
    root: &Flow,
    reactor: ReactorRef,
    input: &FlowInput,
) -> Result<ReactResult> {
    let flow = flow_at(root, reactor.depth());
    let view = FlowView { root, nearest: flow };
    match reactor {
        ReactorRef::NodeAt(_) => match flow.nodes.last() {
            Some(Node::Simple(node)) => node.react_to(deps, view, input).await,
            _ => Err(FlowError::IncompatibleInput),
        },
        ReactorRef::IntentAt(_) => flow.intent.react_to(deps, view, input).await,
    }
}

fn append(root: &mut Flow, depth: usize, result: ReactResult) {
    match result {
        ReactResult::Node(node) => push_at(root, depth, Node::Simple(node)),
        ReactResult::SubFlow(intent) => push_at(root, depth, Node::SubFlow(Flow::new(intent))),
        ReactResult::Unchanged => {}
    }
}

async fn drive(
    deps: &Dependencies,
    instance: &mut FlowInstance,
    mut input: Option<FlowInput>,
) -> Result<()> {
    loop {
        let location = find_input_reactor(deps, &instance.root).await?;
        let depth = location.reactor.depth();

        let step_input = match location.schema {
            // Auto-advancing reactor: feed it an empty input.
            None => FlowInput::empty(),
            Some(schema) => match input.take() {
                Some(external) => {
                    schema.validate(external.raw())?;
                    external
                }
                // Waiting for the client; nothing left to consume.
                None => return Ok(()),
            },
        };

        let result = react_at(deps, &instance.root, location.reactor, &step_input).await?;
        append(&mut instance.root, depth, result);
    }
}

/// Feed one client input to the flow and advance it as far as it goes
/// without further input.
///
/// The input is consumed at most once, by the reactor that currently
/// waits for it. On success the instance has strictly grown (or, for
/// in-place reactions such as a resend, stayed identical) and sits at
/// its next wait point.
///
/// # Errors
///
/// Returns [`FlowError::Eof`] when the flow reaches its terminal state —
/// the caller must finalize. Domain errors (wrong credentials, rate
/// limits, ...) propagate with the instance left at the same wait point.
pub async fn accept(
    deps: &Dependencies,
    instance: &mut FlowInstance,
    raw: &serde_json::Value,
) -> Result<()> {
    drive(deps, instance, Some(FlowInput::new(raw.clone()))).await
}

/// Advance a freshly created flow to its first wait point without
/// consuming any input.
///
/// # Errors
///
/// Returns [`FlowError::Eof`] when the flow finishes without ever
/// needing input; other reactor errors propagate unchanged.
pub async fn advance(deps: &Dependencies, instance: &mut FlowInstance) -> Result<()> {
    drive(deps, instance, None).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::reactor::{Intent, NodeSimple};
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
    struct FactNode;

    #[async_trait]
    impl NodeSimple for FactNode {
        fn kind(&self) -> &'static str {
            "fact_node"
        }

        fn data(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
    }

    fn nested_flow() -> Flow {
        let mut inner = Flow::new(Box::new(InertIntent));
        inner.nodes.push(Node::Simple(Box::new(FactNode)));
        let mut middle = Flow::new(Box::new(InertIntent));
        middle.nodes.push(Node::SubFlow(inner));
        let mut root = Flow::new(Box::new(InertIntent));
        root.nodes.push(Node::Simple(Box::new(FactNode)));
        root.nodes.push(Node::SubFlow(middle));
        root
    }

    fn trailing_sub_flow(flow: &Flow) -> &Flow {
        match flow.nodes.last() {
            Some(Node::SubFlow(sub)) => sub,
            _ => panic!("expected a trailing sub-flow"),
        }
    }

    #[test]
    fn append_lands_on_the_flow_at_the_given_depth() {
        let mut root = nested_flow();
        append(&mut root, 1, ReactResult::Node(Box::new(FactNode)));

        let middle = trailing_sub_flow(&root);
        assert_eq!(middle.nodes.len(), 2);
        assert!(matches!(middle.nodes.last(), Some(Node::Simple(_))));
        // Root gained nothing; the inner flow is untouched.
        assert_eq!(root.nodes.len(), 2);
    }

    #[test]
    fn append_at_depth_zero_targets_the_root() {
        let mut root = nested_flow();
        append(&mut root, 0, ReactResult::SubFlow(Box::new(InertIntent)));
        assert_eq!(root.nodes.len(), 3);
        assert_eq!(deepest_depth(&root), 1);
    }

    #[test]
    fn append_clamps_to_the_deepest_trailing_sub_flow() {
        let mut root = nested_flow();
        assert_eq!(deepest_depth(&root), 2);

        append(&mut root, 5, ReactResult::Node(Box::new(FactNode)));
        let inner = trailing_sub_flow(trailing_sub_flow(&root));
        assert_eq!(inner.nodes.len(), 2);
    }

    #[test]
    fn unchanged_leaves_the_graph_alone() {
        let mut root = nested_flow();
        append(&mut root, 2, ReactResult::Unchanged);
        assert_eq!(root.total_len(), 4);
    }
}
