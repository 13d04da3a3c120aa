//! # Action Dispatcher
//!
//! Invokes operations by identifier and blocks until they finish.
//!
//! Operations are registered once at startup in an `OperationRegistry`;
//! callers only ever name them. `Dispatcher::execute`:
//!
//! 1. creates the action node with its ordinal arguments and trigger edge,
//! 2. runs the handler on a dedicated worker thread,
//! 3. waits on a completion channel for at most the configured timeout.
//!
//! The worker writes the result and status in one write and then signals, so
//! every invocation gets at most one completion signal. Nothing is retried.
//! A result that cannot be recorded, or a worker that dies before
//! signalling, leaves the action finished unsuccessfully.
//! After a timeout the worker is not cancelled; if it finishes later its
//! status lands in the graph but nobody is waiting for it.

use crate::action::{self, ActionContext, ActionOutcome, ActionStatus};
use crate::collection::Collection;
use crate::primitives::DEFAULT_ACTION_TIMEOUT_MS;
use crate::session::KnowledgeBase;
use crate::{Addr, NodeKind, SemnetError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

// =============================================================================
// OPERATIONS
// =============================================================================

/// A handler invoked through an action.
///
/// `run` returns the items of the result structure. An `Err` marks the
/// action as finished unsuccessfully.
pub trait Operation: Send + Sync {
    /// Stable identifier, also the system identifier of the operation class.
    fn identifier(&self) -> &str;

    fn run(&self, ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError>;
}

/// Identifier → handler map.
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: BTreeMap<String, Arc<dyn Operation>>,
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Identifiers must be unique.
    pub fn register(&mut self, operation: impl Operation + 'static) -> Result<(), SemnetError> {
        let identifier = operation.identifier().to_string();
        if self.operations.contains_key(&identifier) {
            return Err(SemnetError::DuplicateIdentifier(identifier));
        }
        self.operations.insert(identifier, Arc::new(operation));
        Ok(())
    }

    /// Look up a handler.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(identifier).cloned()
    }

    /// Registered identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Synchronous action dispatcher.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    kb: KnowledgeBase,
    registry: Arc<OperationRegistry>,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the default completion timeout.
    #[must_use]
    pub fn new(kb: KnowledgeBase, registry: OperationRegistry) -> Self {
        Self {
            kb,
            registry: Arc::new(registry),
            timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
        }
    }

    /// Set the bound on the wait for a completion signal.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run `operation` on `arguments` and wait for it to finish.
    ///
    /// Returns the action and its final status; a failed status is not an
    /// error here. Fails with `OperationTimeout` if no completion signal
    /// arrives in time.
    pub fn execute(&self, operation: &str, arguments: &[Addr]) -> Result<ActionOutcome, SemnetError> {
        let handler = self
            .registry
            .get(operation)
            .ok_or_else(|| SemnetError::UnknownOperation(operation.to_string()))?;

        let action = self.kb.write(|graph, keynodes| {
            let class = keynodes.resolve_or_create(graph, operation, NodeKind::Class)?;
            let action = action::create_action(graph, keynodes, class, arguments)?;
            action::initiate(graph, keynodes, action)?;
            Ok(action)
        })?;
        tracing::debug!(operation, %action, arguments = arguments.len(), "action initiated");

        let (done_tx, done_rx) = mpsc::channel();
        let ctx = ActionContext::new(self.kb.clone(), action, operation, arguments.to_vec());
        thread::Builder::new()
            .name(format!("semnet-{operation}"))
            .spawn(move || {
                let outcome = handler.run(&ctx);
                if let Err(e) = &outcome {
                    tracing::warn!(operation = ctx.operation(), error = %e, "operation failed");
                }
                let status = ctx.kb().write(|graph, keynodes| {
                    action::finish(graph, keynodes, ctx.action(), &outcome).or_else(|e| {
                        tracing::warn!(operation = ctx.operation(), error = %e, "result not recorded");
                        action::mark_failed(graph, keynodes, ctx.action())
                    })
                });
                // The receiver is gone if the caller already timed out.
                let _ = done_tx.send(status);
            })
            .map_err(|e| SemnetError::IoError(format!("failed to spawn worker: {e}")))?;

        match done_rx.recv_timeout(self.timeout) {
            Ok(status) => Ok(ActionOutcome {
                action,
                status: status?,
            }),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(operation, %action, timeout_ms = self.timeout_ms(), "action timed out");
                Err(SemnetError::OperationTimeout {
                    operation: operation.to_string(),
                    timeout_ms: self.timeout_ms(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!(operation, %action, "worker exited without signalling");
                let status = self
                    .kb
                    .write(|graph, keynodes| action::mark_failed(graph, keynodes, action))
                    .map_err(|e| {
                        tracing::warn!(operation, %action, error = %e, "failure status not recorded");
                        SemnetError::OperationFailed {
                            operation: operation.to_string(),
                            action,
                        }
                    })?;
                Ok(ActionOutcome { action, status })
            }
        }
    }

    /// Like `execute`, but a failed status becomes `OperationFailed`.
    pub fn invoke(&self, operation: &str, arguments: &[Addr]) -> Result<Addr, SemnetError> {
        let outcome = self.execute(operation, arguments)?;
        if outcome.status != ActionStatus::Succeeded {
            return Err(SemnetError::OperationFailed {
                operation: operation.to_string(),
                action: outcome.action,
            });
        }
        Ok(outcome.action)
    }

    /// Invoke and read back the result items.
    pub fn invoke_members(&self, operation: &str, arguments: &[Addr]) -> Result<Vec<Addr>, SemnetError> {
        let action = self.invoke(operation, arguments)?;
        self.result_members(action)
    }

    /// Current status of `action`.
    pub fn status(&self, action: Addr) -> Result<ActionStatus, SemnetError> {
        self.kb
            .read(|graph, keynodes| action::status(graph, keynodes, action))
    }

    /// The result structure of `action`, if attached.
    pub fn result_of(&self, action: Addr) -> Result<Option<Addr>, SemnetError> {
        self.kb
            .read(|graph, keynodes| action::result_of(graph, keynodes, action))
    }

    /// Items of the result structure; empty if there is none.
    pub fn result_members(&self, action: Addr) -> Result<Vec<Addr>, SemnetError> {
        self.kb.read(|graph, keynodes| {
            match action::result_of(graph, keynodes, action)? {
                Some(result) => Ok(Collection::load(graph, result, true)?.members().to_vec()),
                None => Ok(Vec::new()),
            }
        })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use std::sync::Mutex;

    struct Echo;

    impl Operation for Echo {
        fn identifier(&self) -> &str {
            "action_echo"
        }

        fn run(&self, ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError> {
            Ok(ctx.arguments().to_vec())
        }
    }

    struct Refuse;

    impl Operation for Refuse {
        fn identifier(&self) -> &str {
            "action_refuse"
        }

        fn run(&self, _ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError> {
            Err(SemnetError::NoResult("refused".to_string()))
        }
    }

    /// Returns an address the graph never allocated.
    struct Stale;

    impl Operation for Stale {
        fn identifier(&self) -> &str {
            "action_stale"
        }

        fn run(&self, _ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError> {
            Ok(vec![Addr(999_999)])
        }
    }

    struct Crash;

    impl Operation for Crash {
        fn identifier(&self) -> &str {
            "action_crash"
        }

        #[allow(clippy::panic)]
        fn run(&self, _ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError> {
            panic!("handler crashed");
        }
    }

    /// Blocks until the test sends on its channel.
    struct Gate(Mutex<mpsc::Receiver<()>>);

    impl Operation for Gate {
        fn identifier(&self) -> &str {
            "action_gate"
        }

        fn run(&self, _ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError> {
            let rx = self
                .0
                .lock()
                .map_err(|_| SemnetError::StoreUnavailable("gate".to_string()))?;
            let _ = rx.recv();
            Ok(Vec::new())
        }
    }

    fn dispatcher(registry: OperationRegistry) -> Dispatcher {
        Dispatcher::new(KnowledgeBase::empty().expect("kb"), registry)
    }

    fn two_nodes(d: &Dispatcher) -> (Addr, Addr) {
        d.kb()
            .write(|graph, _| {
                Ok((
                    graph.create_node(NodeKind::Plain)?,
                    graph.create_node(NodeKind::Plain)?,
                ))
            })
            .expect("nodes")
    }

    #[test]
    fn execute_returns_result_members() {
        let mut registry = OperationRegistry::new();
        registry.register(Echo).expect("register");
        let d = dispatcher(registry);
        let (a, b) = two_nodes(&d);

        let outcome = d.execute("action_echo", &[a, b]).expect("execute");
        assert!(outcome.succeeded());
        assert_eq!(d.result_members(outcome.action).expect("members"), vec![a, b]);
        assert_eq!(d.status(outcome.action).expect("status"), ActionStatus::Succeeded);
    }

    #[test]
    fn failed_status_is_reported_not_raised_by_execute() {
        let mut registry = OperationRegistry::new();
        registry.register(Refuse).expect("register");
        let d = dispatcher(registry);

        let outcome = d.execute("action_refuse", &[]).expect("execute");
        assert_eq!(outcome.status, ActionStatus::Failed);
        assert!(d.result_of(outcome.action).expect("result").is_none());
    }

    #[test]
    fn invoke_escalates_failed_status() {
        let mut registry = OperationRegistry::new();
        registry.register(Refuse).expect("register");
        let d = dispatcher(registry);

        assert!(matches!(
            d.invoke("action_refuse", &[]),
            Err(SemnetError::OperationFailed { operation, .. }) if operation == "action_refuse"
        ));
    }

    #[test]
    fn stale_result_item_fails_the_action() {
        let mut registry = OperationRegistry::new();
        registry.register(Stale).expect("register");
        let d = dispatcher(registry);

        let outcome = d.execute("action_stale", &[]).expect("execute");
        assert_eq!(outcome.status, ActionStatus::Failed);
        assert_eq!(d.status(outcome.action).expect("status"), ActionStatus::Failed);
        assert!(d.result_of(outcome.action).expect("result").is_none());

        let before = d.kb().stats().expect("stats");
        assert!(matches!(
            d.invoke("action_stale", &[]),
            Err(SemnetError::OperationFailed { operation, .. }) if operation == "action_stale"
        ));
        let after = d.kb().stats().expect("stats");
        // Action node with its two class edges, the trigger edge, two status edges.
        assert_eq!(after.elements, before.elements + 6);
    }

    #[test]
    fn crashed_worker_leaves_a_failed_status() {
        let mut registry = OperationRegistry::new();
        registry.register(Crash).expect("register");
        let d = dispatcher(registry);

        let outcome = d.execute("action_crash", &[]).expect("execute");
        assert_eq!(outcome.status, ActionStatus::Failed);
        assert_eq!(d.status(outcome.action).expect("status"), ActionStatus::Failed);
        assert!(matches!(
            d.invoke("action_crash", &[]),
            Err(SemnetError::OperationFailed { .. })
        ));
    }

    #[test]
    fn unknown_operation_creates_nothing() {
        let d = dispatcher(OperationRegistry::new());
        let before = d.kb().stats().expect("stats");

        assert!(matches!(
            d.execute("action_missing", &[]),
            Err(SemnetError::UnknownOperation(_))
        ));
        assert_eq!(d.kb().stats().expect("stats"), before);
    }

    #[test]
    fn silent_operation_times_out_with_status_unset() {
        let (release, gate_rx) = mpsc::channel();
        let mut registry = OperationRegistry::new();
        registry.register(Gate(Mutex::new(gate_rx))).expect("register");
        let d = dispatcher(registry).with_timeout(Duration::from_millis(50));

        let err = d.execute("action_gate", &[]).expect_err("must time out");
        assert!(matches!(
            err,
            SemnetError::OperationTimeout { timeout_ms: 50, .. }
        ));

        let action = d
            .kb()
            .read(|graph, keynodes| {
                let class = keynodes.resolve(graph, "action_gate")?;
                let edges = graph.outgoing(class)?;
                let edge = edges.first().copied().ok_or(SemnetError::NoResult("edge".into()))?;
                Ok(graph.element(edge)?.and_then(|e| e.as_edge()).map(|(_, _, t)| t))
            })
            .expect("read")
            .expect("action");
        assert_eq!(d.status(action).expect("status"), ActionStatus::Pending);

        release.send(()).expect("release");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = OperationRegistry::new();
        registry.register(Echo).expect("first");
        assert!(matches!(
            registry.register(Echo),
            Err(SemnetError::DuplicateIdentifier(_))
        ));
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["action_echo"]);
    }
}
