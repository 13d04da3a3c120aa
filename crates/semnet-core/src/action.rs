//! # Actions
//!
//! An action is a node modelling one invocation of an operation.
//!
//! ```text
//! action ──────────────▶ A ◀── operation class
//! action_initiated ────▶ A
//! A ──rrel_1──▶ arg1, A ──rrel_2──▶ arg2, ...
//! A ══nrel_result══▶ result structure        (after completion)
//! action_finished ─────▶ A
//! action_finished_successfully | _unsuccessfully ──▶ A
//! ```
//!
//! The status classes are written exactly once, by the worker that ran the
//! operation, in the same write that attaches the result. If the worker dies
//! first, the dispatcher writes the unsuccessful status instead.

use crate::collection::Collection;
use crate::graph::GraphStore;
use crate::keynodes::Keynodes;
use crate::matcher::Matcher;
use crate::primitives::{MAX_ACTION_ARGUMENTS, keynodes};
use crate::session::KnowledgeBase;
use crate::template::{Template, Term, VarType};
use crate::{Addr, EdgeType, NodeKind, SemnetError};
use serde::{Deserialize, Serialize};

/// Completion state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// No completion signal yet.
    Pending,
    Succeeded,
    Failed,
}

/// What `Dispatcher::execute` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: Addr,
    pub status: ActionStatus,
}

impl ActionOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == ActionStatus::Succeeded
    }
}

/// Everything an operation sees while it runs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    kb: KnowledgeBase,
    action: Addr,
    operation: String,
    arguments: Vec<Addr>,
}

impl ActionContext {
    pub(crate) fn new(
        kb: KnowledgeBase,
        action: Addr,
        operation: &str,
        arguments: Vec<Addr>,
    ) -> Self {
        Self {
            kb,
            action,
            operation: operation.to_string(),
            arguments,
        }
    }

    /// The knowledge base the action lives in.
    #[must_use]
    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    #[must_use]
    pub fn action(&self) -> Addr {
        self.action
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn arguments(&self) -> &[Addr] {
        &self.arguments
    }

    /// The `index`-th argument (1-based, matching its ordinal tag).
    pub fn argument(&self, index: usize) -> Result<Addr, SemnetError> {
        index
            .checked_sub(1)
            .and_then(|i| self.arguments.get(i))
            .copied()
            .ok_or_else(|| {
                SemnetError::InvalidArguments(format!(
                    "{} expects argument {index}, got {}",
                    self.operation,
                    self.arguments.len()
                ))
            })
    }
}

// =============================================================================
// ACTION STRUCTURE
// =============================================================================

/// Create an action node of `operation_class` with ordinally tagged arguments.
pub fn create_action<G: GraphStore>(
    graph: &mut G,
    keynodes: &Keynodes,
    operation_class: Addr,
    arguments: &[Addr],
) -> Result<Addr, SemnetError> {
    if arguments.len() > MAX_ACTION_ARGUMENTS {
        return Err(SemnetError::InvalidArguments(format!(
            "{} arguments exceeds maximum {}",
            arguments.len(),
            MAX_ACTION_ARGUMENTS
        )));
    }

    let action_class = keynodes.resolve(graph, keynodes::ACTION)?;
    let action = graph.create_node(NodeKind::Plain)?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, action_class, action)?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, operation_class, action)?;

    for (i, argument) in arguments.iter().enumerate() {
        let membership = graph.create_edge(EdgeType::ACCESS_POS_PERM, action, *argument)?;
        let ordinal = keynodes.ordinal_or_create(graph, i + 1)?;
        graph.create_edge(EdgeType::ACCESS_POS_PERM, ordinal, membership)?;
    }
    Ok(action)
}

/// Add the trigger edge the operation listens on.
pub fn initiate<G: GraphStore>(
    graph: &mut G,
    keynodes: &Keynodes,
    action: Addr,
) -> Result<(), SemnetError> {
    let initiated = keynodes.resolve(graph, keynodes::ACTION_INITIATED)?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, initiated, action)?;
    Ok(())
}

/// Arguments of `action` in ordinal order.
pub fn arguments<G: GraphStore>(graph: &G, action: Addr) -> Result<Vec<Addr>, SemnetError> {
    Ok(Collection::load(graph, action, true)?.members().to_vec())
}

/// Attach the result and the status classes.
///
/// A successful outcome materializes its items as an ordered result
/// structure; a failed one leaves the action without a result. A successful
/// outcome naming an element the graph does not hold is recorded as a
/// failure and nothing of its result is written.
pub(crate) fn finish<G: GraphStore>(
    graph: &mut G,
    keynodes: &Keynodes,
    action: Addr,
    outcome: &Result<Vec<Addr>, SemnetError>,
) -> Result<ActionStatus, SemnetError> {
    if status(graph, keynodes, action)? != ActionStatus::Pending {
        return Err(SemnetError::InvalidArguments(format!(
            "action {action} already finished"
        )));
    }

    let items = match outcome {
        Ok(items) => match first_missing(graph, items)? {
            Some(stale) => {
                tracing::warn!(%action, %stale, "result names an unknown element");
                None
            }
            None => Some(items),
        },
        Err(_) => None,
    };

    match items {
        Some(items) => {
            let result = Collection::from_members(graph, keynodes, items, true)?;
            let nrel_result = keynodes.resolve(graph, keynodes::NREL_RESULT)?;
            let pair = graph.create_edge(EdgeType::COMMON, action, result.node())?;
            graph.create_edge(EdgeType::ACCESS_POS_PERM, nrel_result, pair)?;
            write_status(graph, keynodes, action, keynodes::ACTION_FINISHED_SUCCESSFULLY)?;
            Ok(ActionStatus::Succeeded)
        }
        None => mark_failed(graph, keynodes, action),
    }
}

/// Record `action` as finished unsuccessfully unless it already finished.
///
/// Returns the final status.
pub(crate) fn mark_failed<G: GraphStore>(
    graph: &mut G,
    keynodes: &Keynodes,
    action: Addr,
) -> Result<ActionStatus, SemnetError> {
    match status(graph, keynodes, action)? {
        ActionStatus::Pending => {
            write_status(graph, keynodes, action, keynodes::ACTION_FINISHED_UNSUCCESSFULLY)?;
            Ok(ActionStatus::Failed)
        }
        finished => Ok(finished),
    }
}

fn write_status<G: GraphStore>(
    graph: &mut G,
    keynodes: &Keynodes,
    action: Addr,
    status_class: &str,
) -> Result<(), SemnetError> {
    let finished = keynodes.resolve(graph, keynodes::ACTION_FINISHED)?;
    let status_class = keynodes.resolve(graph, status_class)?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, finished, action)?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, status_class, action)?;
    Ok(())
}

fn first_missing<G: GraphStore>(graph: &G, items: &[Addr]) -> Result<Option<Addr>, SemnetError> {
    for item in items {
        if !graph.contains(*item)? {
            return Ok(Some(*item));
        }
    }
    Ok(None)
}

/// Read the completion state of `action`.
pub fn status<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    action: Addr,
) -> Result<ActionStatus, SemnetError> {
    let succeeded = keynodes.resolve(graph, keynodes::ACTION_FINISHED_SUCCESSFULLY)?;
    if is_member(graph, succeeded, action)? {
        return Ok(ActionStatus::Succeeded);
    }
    let failed = keynodes.resolve(graph, keynodes::ACTION_FINISHED_UNSUCCESSFULLY)?;
    if is_member(graph, failed, action)? {
        return Ok(ActionStatus::Failed);
    }
    Ok(ActionStatus::Pending)
}

/// The result structure of `action`, if one was attached.
pub fn result_of<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    action: Addr,
) -> Result<Option<Addr>, SemnetError> {
    let nrel_result = keynodes.resolve(graph, keynodes::NREL_RESULT)?;
    let template = Template::new().quintuple(
        action,
        Term::edge_var(EdgeType::COMMON),
        Term::var("result", VarType::NodeOf(NodeKind::Structure)),
        Term::edge_var(EdgeType::ACCESS_POS_PERM),
        nrel_result,
    );
    Matcher::first(graph, &template)?
        .map(|binding| binding.require("result"))
        .transpose()
}

/// Check for a positive access edge `class → element`.
pub fn is_member<G: GraphStore>(graph: &G, class: Addr, element: Addr) -> Result<bool, SemnetError> {
    let template = Template::new().triple(class, Term::edge_var(EdgeType::ACCESS_POS_PERM), element);
    Ok(Matcher::first(graph, &template)?.is_some())
}

// =============================================================================
// TESTS
// =============================================================================
