use std::num::NonZeroUsize;

/// How a phase forwards its outputs, as declared in a pipeline description.
///
/// `Stage` is the default: every output is forwarded as soon as the module
/// returns it. `Accumulate` is a hint that the module buffers internally and
/// only returns output from `handle_inputs_done`; the worker does not enforce
/// this, it only documents what the module is expected to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardingKind {
    Stage,
    Accumulate,
}

impl Default for ForwardingKind {
    fn default() -> Self {
        ForwardingKind::Stage
    }
}

/// The behaviors attached to one phase in a pipeline description.
///
/// `converge` carries the peer count `N` from `{converge, N}`; it is consumed
/// by the flow builder when it spawns the `N` workers and is not retained on
/// the worker itself (see `WorkerBehaviors`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBehaviors {
    pub forwarding: ForwardingKind,
    pub converge: Option<NonZeroUsize>,
}

impl PhaseBehaviors {
    pub fn stage() -> Self {
        Self {
            forwarding: ForwardingKind::Stage,
            converge: None,
        }
    }

    pub fn accumulate() -> Self {
        Self {
            forwarding: ForwardingKind::Accumulate,
            converge: None,
        }
    }

    pub fn converging(self, n: NonZeroUsize) -> Self {
        Self {
            converge: Some(n),
            ..self
        }
    }

    pub fn peer_count(&self) -> usize {
        self.converge.map_or(1, NonZeroUsize::get)
    }

    pub fn is_converging(&self) -> bool {
        self.converge.is_some()
    }
}

impl Default for PhaseBehaviors {
    fn default() -> Self {
        Self::stage()
    }
}

/// The behaviors retained on a live `PhaseWorker`, after `{converge, N}` has
/// been normalized down to a plain flag at construction time (see design
/// note "Converge normalization").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WorkerBehaviors {
    pub accumulate: bool,
    pub converge: bool,
}

impl From<PhaseBehaviors> for WorkerBehaviors {
    fn from(b: PhaseBehaviors) -> Self {
        Self {
            accumulate: matches!(b.forwarding, ForwardingKind::Accumulate),
            converge: b.is_converging(),
        }
    }
}
