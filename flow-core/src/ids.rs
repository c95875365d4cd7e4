use std::fmt;

/// Opaque identifier for one end-to-end execution of a pipeline.
///
/// Chosen by the client when it starts a flow and carried on every result and
/// error message sent back to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowId(pub u64);

/// Zero-based index of a phase in a pipeline, head = 0, tail = `len - 1`.
///
/// Assigned by the flow at construction time and carried as the `PhaseId`
/// tag on every result the phase emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseId(pub usize);

impl PhaseId {
    /// Returns whether this is the head phase of a pipeline of the given length.
    pub fn is_head(self) -> bool {
        self.0 == 0
    }

    /// Returns whether this is the tail phase of a pipeline of the given length.
    pub fn is_tail(self, pipeline_len: usize) -> bool {
        pipeline_len > 0 && self.0 == pipeline_len - 1
    }
}

/// Identifies one physical worker within a (possibly converging) phase.
///
/// `member` is always `0` for a phase backed by a single worker; for a
/// `{converge, N}` phase it ranges over `0..N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub phase: PhaseId,
    pub member: usize,
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase{}/member{}", self.phase.0, self.member)
    }
}
