use std::fmt;

use crate::ids::{FlowId, PhaseId, WorkerId};

/// The reason a [`PhaseWorker`](crate) (or a member of a `ConvergenceGroup`)
/// exited abnormally.
///
/// Carried unchanged from the worker to the flow to the client, so the
/// client sees exactly why its flow failed rather than a generic "a worker
/// died" message.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExitReason {
    /// A module callback (`handle_input`, `handle_timeout`,
    /// `handle_inputs_done`, `handle_sync_inputs`) returned an error.
    #[error("phase module at {worker} failed: {message}")]
    ModuleError { worker: WorkerId, message: String },

    /// A module callback panicked.
    #[error("phase module at {worker} panicked: {message}")]
    ModulePanic { worker: WorkerId, message: String },

    /// The worker received an input after it had already observed EOI
    /// (`inbox_state` was `DoneLocal` or `DoneAnnounced`).
    #[error("worker {worker} received input after end-of-input")]
    InputAfterEoi { worker: WorkerId },

    /// Forwarding an output to a downstream worker failed because the
    /// downstream mailbox was gone.
    #[error("worker {worker} failed to forward output downstream: {message}")]
    ForwardingFailed { worker: WorkerId, message: String },
}

/// Error returned by `Flow::start` when the pipeline could not be built.
///
/// On `StartError` no partial flow is exposed to the caller: any worker that
/// had already been spawned while building the rest of the pipeline is torn
/// down before the error is returned.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StartError {
    #[error("phase {phase} failed to initialize: {message}")]
    PhaseInitFailed { phase: PhaseId, message: String },

    #[error("pipeline description is empty")]
    EmptyPipeline,

    #[error("phase {phase} declared {n} as its convergence peer count, which must be >= 1")]
    InvalidConvergeCount { phase: PhaseId, n: usize },
}

/// The single terminal error delivered to a flow's client.
///
/// Exactly one of `FlowError::Timeout` or `FlowError::Phase` is delivered per
/// flow that does not complete with `done` (terminal uniqueness, testable
/// property 1).
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowError {
    /// `flow_timeout` elapsed before the tail phase signalled done.
    #[error("flow timed out before completion")]
    Timeout,

    /// Some worker in the pipeline died abnormally.
    #[error("flow failed: {0}")]
    Phase(#[from] ExitReason),

    /// The client issued a command after the flow had already terminated.
    /// Not produced by the Flow itself; surfaced by `FlowHandle` when its
    /// command channel is found closed.
    #[error("flow {0} has already terminated")]
    Closed(FlowId),
}

/// Error returned by [`ResultCollector::collect`](crate) when its own
/// per-collect timeout elapses with nothing accumulated yet.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("collect timed out with no results accumulated")]
pub struct CollectTimeout;

/// Marker returned by `cache_get` for an absent key. Not an error: callers
/// are expected to treat it as a normal "nothing cached yet" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound;

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key not found in flow cache")
    }
}
