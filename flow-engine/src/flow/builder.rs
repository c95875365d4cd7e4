//! Pipeline construction: building a pipeline tail-to-head so each phase's
//! `next` handles already exist when the phase in front of it is spawned.
//!
//! A pipeline is built starting from its tail so that each phase's `next`
//! handles already exist by the time the phase in front of it is spawned.
//! Each [`PipelineStep`] captures its module and behaviors in a boxed
//! closure that is only invoked once the downstream handles it needs are
//! known.

use std::num::NonZeroUsize;
use std::sync::Arc;

use flow_core::{FlowId, PhaseBehaviors, PhaseId, StartError, WorkerBehaviors, WorkerId};

use crate::link::{converge_done_channel, FlowEventHandle, WorkerHandle};
use crate::phase::{spawn_worker, ConvergeRole, PhaseModule, WorkerSpawn};

pub(crate) struct SpawnedPhase<V> {
    pub(crate) handles: Vec<WorkerHandle<V>>,
    pub(crate) tasks: Vec<(WorkerId, tokio::task::JoinHandle<()>)>,
}

type PhaseBuildFn<V> = Box<
    dyn FnOnce(
            FlowId,
            PhaseId,
            Vec<WorkerHandle<V>>,
            FlowEventHandle<V>,
        ) -> Result<SpawnedPhase<V>, StartError>
        + Send,
>;

/// One phase in a pipeline description, not yet assigned a `PhaseId` (the
/// assignment happens from position when the pipeline is built).
pub struct PipelineStep<V> {
    build: PhaseBuildFn<V>,
}

/// Describes one phase from its module and behaviors (`stage`, `accumulate`,
/// `{converge, N}`).
pub fn phase<M, V>(module: M, behaviors: PhaseBehaviors) -> PipelineStep<V>
where
    M: PhaseModule<V>,
    V: Send + 'static,
{
    let peer_count = behaviors.peer_count();
    let worker_behaviors = WorkerBehaviors::from(behaviors);
    let module = Arc::new(module);

    let build: PhaseBuildFn<V> = Box::new(move |flow_id, phase_id, next, flow| {
        spawn_phase(flow_id, phase_id, module, worker_behaviors, peer_count, next, flow)
    });

    PipelineStep { build }
}

/// Builds a `{converge, N}` phase from a raw peer count, as read from a
/// config file where `N` arrives as an untyped integer. Validates `N >= 1`
/// itself rather than relying on the caller to have a `NonZeroUsize` handy.
pub fn converging_phase<M, V>(module: M, n: usize) -> Result<PipelineStep<V>, StartError>
where
    M: PhaseModule<V>,
    V: Send + 'static,
{
    let n = NonZeroUsize::new(n).ok_or(StartError::InvalidConvergeCount {
        phase: PhaseId(0),
        n: 0,
    })?;
    Ok(phase(module, PhaseBehaviors::stage().converging(n)))
}

fn spawn_phase<M, V>(
    flow_id: FlowId,
    phase_id: PhaseId,
    module: Arc<M>,
    behaviors: WorkerBehaviors,
    peer_count: usize,
    next: Vec<WorkerHandle<V>>,
    flow: FlowEventHandle<V>,
) -> Result<SpawnedPhase<V>, StartError>
where
    M: PhaseModule<V>,
    V: Send + 'static,
{
    if peer_count == 0 {
        return Err(StartError::InvalidConvergeCount {
            phase: phase_id,
            n: 0,
        });
    }

    let mut handles = Vec::with_capacity(peer_count);
    let mut tasks = Vec::with_capacity(peer_count);

    if peer_count == 1 {
        let id = WorkerId {
            phase: phase_id,
            member: 0,
        };
        let WorkerSpawn { handle, task } = spawn_worker(
            flow_id,
            id,
            module,
            next,
            flow,
            behaviors,
            ConvergeRole::Solo,
        );
        handles.push(handle);
        tasks.push((id, task));
        return Ok(SpawnedPhase { handles, tasks });
    }

    // Member 0 is the leader, by convention "first-created member".
    let (leader_tx, leader_rx) = converge_done_channel();
    let mut leader_rx = Some(leader_rx);

    for member in 0..peer_count {
        let id = WorkerId {
            phase: phase_id,
            member,
        };
        let role = if member == 0 {
            ConvergeRole::Leader {
                partner_count: peer_count - 1,
                done_rx: leader_rx.take().expect("leader built exactly once"),
            }
        } else {
            ConvergeRole::Member {
                leader_tx: leader_tx.clone(),
            }
        };
        let WorkerSpawn { handle, task } = spawn_worker(
            flow_id,
            id,
            Arc::clone(&module),
            next.clone(),
            flow.clone(),
            behaviors,
            role,
        );
        handles.push(handle);
        tasks.push((id, task));
    }

    Ok(SpawnedPhase { handles, tasks })
}

/// The live product of building a pipeline: the head phase's worker handles
/// (more than one iff the head is a `{converge, N}` phase), every phase's id
/// in order, and every worker task spawned, for the `Flow` to supervise.
pub(crate) struct BuiltPipeline<V> {
    pub(crate) head: Vec<WorkerHandle<V>>,
    pub(crate) phase_ids: Vec<PhaseId>,
    pub(crate) tasks: Vec<(WorkerId, tokio::task::JoinHandle<()>)>,
}

/// Builds every phase in `steps`, tail first, wiring each phase's `next` to
/// the phase already built behind it. On any [`StartError`], every
/// already-spawned worker task is aborted and the error is returned; no
/// partial pipeline is ever exposed to the caller.
pub(crate) fn build_pipeline<V>(
    flow_id: FlowId,
    steps: Vec<PipelineStep<V>>,
    flow: FlowEventHandle<V>,
) -> Result<BuiltPipeline<V>, StartError>
where
    V: Send + 'static,
{
    if steps.is_empty() {
        return Err(StartError::EmptyPipeline);
    }
    let len = steps.len();
    let mut next: Vec<WorkerHandle<V>> = Vec::new();
    let mut all_tasks = Vec::new();

    for (idx, step) in steps.into_iter().enumerate().rev() {
        let phase_id = PhaseId(idx);
        match (step.build)(flow_id, phase_id, next, flow.clone()) {
            Ok(spawned) => {
                all_tasks.extend(spawned.tasks);
                next = spawned.handles;
            }
            Err(err) => {
                for (_, task) in all_tasks {
                    task.abort();
                }
                return Err(err);
            }
        }
    }

    Ok(BuiltPipeline {
        head: next,
        phase_ids: (0..len).map(PhaseId).collect(),
        tasks: all_tasks,
    })
}
