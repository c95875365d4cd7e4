//! Identifiers, pipeline description types and error kinds shared between the
//! flow coordinator's actors and its clients.
//!
//! This crate has no async runtime dependency: it exists so that a client can
//! depend on the vocabulary of the coordinator (`FlowId`, `PhaseId`,
//! `FlowError`, ...) without pulling in `flow-engine` and its actor runtime.

mod behavior;
mod error;
mod ids;

pub use behavior::{ForwardingKind, PhaseBehaviors, WorkerBehaviors};
pub use error::{CollectTimeout, ExitReason, FlowError, NotFound, StartError};
pub use ids::{FlowId, PhaseId, WorkerId};
