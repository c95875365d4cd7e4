//! Phase workers: the actors that run one user-supplied [`PhaseModule`] each.

pub(crate) mod distribute;
pub mod module;
mod worker;

pub use module::{ModuleError, ModuleOutcome, PhaseModule};
pub(crate) use worker::{spawn_worker, ConvergeRole, WorkerSpawn};
