//! The phase module contract.
//!
//! A phase module is the opaque, user-supplied business logic for one phase.
//! It is deliberately not an object-safe trait with an associated state type:
//! each `PhaseWorker<M>` is monomorphized over its module `M`, so `M::State`
//! never needs to be erased or boxed. Only the channel handle that lets other
//! actors talk to a worker (`WorkerHandle<V>`, see `phase::worker`) needs to
//! be uniform across phases, and it carries no module-specific type.

use async_trait::async_trait;

/// Error returned by a module callback.
///
/// Any `Err` here is converted by the owning `PhaseWorker` into
/// [`flow_core::ExitReason::ModuleError`] and reported to the flow; the
/// worker task then exits.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ModuleError(pub String);

impl ModuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The outcome of a module callback: the outputs to forward, in order, plus
/// the module's next state.
pub type ModuleOutcome<V, S> = Result<(Vec<V>, S), ModuleError>;

/// A phase module: the business logic invoked by one `PhaseWorker`.
///
/// `V` is the value type flowing through the whole pipeline (inputs and
/// outputs share one type end to end, per the flow coordinator's data
/// model). `State` is private to this module and is never
/// inspected by the worker; it is simply threaded from one callback to the
/// next.
#[async_trait]
pub trait PhaseModule<V>: Send + Sync + 'static
where
    V: Send + 'static,
{
    /// Per-worker state, opaque to everything but this module.
    type State: Send + 'static;

    /// Builds the initial state for one worker instance.
    async fn init(&self) -> Self::State;

    /// Handles one input, returning zero or more outputs plus the next state.
    async fn handle_input(&self, input: V, state: Self::State) -> ModuleOutcome<V, Self::State>;

    /// Handles the wall-clock timeout firing while this worker was waiting
    /// for input. The default implementation does nothing and keeps the
    /// state unchanged; most phase modules never need this.
    async fn handle_timeout(&self, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok((Vec::new(), state))
    }

    /// Handles local end-of-input: no more inputs will arrive for this
    /// worker. The default implementation emits nothing, which is correct
    /// for `stage` modules that already forwarded everything eagerly;
    /// `accumulate` modules override this to emit their accumulated result.
    async fn handle_inputs_done(&self, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok((Vec::new(), state))
    }

    /// Optional fast path for a batch submitted synchronously
    /// (`Flow::add_inputs`). The default implementation folds
    /// `handle_input` over the batch in order, which is always correct; a
    /// module overrides this only to process a batch more efficiently than
    /// one input at a time.
    async fn handle_sync_inputs(
        &self,
        inputs: Vec<V>,
        mut state: Self::State,
    ) -> ModuleOutcome<V, Self::State> {
        let mut outputs = Vec::new();
        for input in inputs {
            let (mut outs, next_state) = self.handle_input(input, state).await?;
            outputs.append(&mut outs);
            state = next_state;
        }
        Ok((outputs, state))
    }
}
