//! Runtime that drives inputs through a pipeline of user-defined phases in
//! parallel and collects their results.
//!
//! See `flow::start` for the entry point, `phase::PhaseModule` for the
//! contract a phase implements, and `collector::ResultCollector` for the
//! client-side helper that drains a flow's result stream.

pub mod app;
mod cache;
pub mod client;
pub mod collector;
pub mod flow;
mod link;
pub mod modules;
pub mod phase;
pub mod settings;
pub mod xformer;

pub use flow_core::{
    CollectTimeout, ExitReason, FlowError, FlowId, ForwardingKind, NotFound, PhaseBehaviors,
    PhaseId, StartError, WorkerBehaviors, WorkerId,
};
