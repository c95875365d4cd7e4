//! The `PhaseWorker` actor and its spawn entry point.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_futures::Instrument;

use flow_core::{ExitReason, FlowId, PhaseId, WorkerBehaviors, WorkerId};

use crate::link::{worker_channel, ConvergeDoneRx, ConvergeDoneTx, FlowEventHandle, WorkerHandle, WorkerMsg};
use crate::phase::distribute::Distributor;
use crate::phase::module::PhaseModule;

/// Where a worker stands with respect to end-of-input:
/// `Open -> DoneLocal -> DoneAnnounced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InboxState {
    Open,
    DoneLocal,
    DoneAnnounced,
}

/// This worker's role with respect to its phase's convergence group, if any.
pub(crate) enum ConvergeRole {
    /// Not part of a `{converge, N}` phase (or `N == 1`, which degenerates
    /// to this).
    Solo,
    /// The elected leader of an `N`-member group; owns the quorum count and
    /// is the only member that ever emits the group's single EOI.
    Leader {
        partner_count: usize,
        done_rx: ConvergeDoneRx,
    },
    /// A non-leader member: reports "I am done" to the leader instead of
    /// emitting EOI itself.
    Member { leader_tx: ConvergeDoneTx },
}

pub(crate) struct WorkerSpawn<V> {
    pub(crate) handle: WorkerHandle<V>,
    pub(crate) task: tokio::task::JoinHandle<()>,
}

/// Spawns one `PhaseWorker` running `module`, forwarding to `next`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn_worker<M, V>(
    flow_id: FlowId,
    id: WorkerId,
    module: Arc<M>,
    next: Vec<WorkerHandle<V>>,
    flow: FlowEventHandle<V>,
    behaviors: WorkerBehaviors,
    role: ConvergeRole,
) -> WorkerSpawn<V>
where
    M: PhaseModule<V>,
    V: Send + 'static,
{
    let (handle, inbox) = worker_channel();
    let span = tracing::info_span!("phase_worker", flow = %flow_id, worker = %id);
    let task = tokio::spawn(
        run(flow_id, id, module, inbox, next, flow, behaviors, role).instrument(span),
    );
    WorkerSpawn { handle, task }
}

async fn run<M, V>(
    _flow_id: FlowId,
    id: WorkerId,
    module: Arc<M>,
    mut inbox: mpsc::UnboundedReceiver<WorkerMsg<V>>,
    next: Vec<WorkerHandle<V>>,
    flow: FlowEventHandle<V>,
    behaviors: WorkerBehaviors,
    mut role: ConvergeRole,
) where
    M: PhaseModule<V>,
    V: Send + 'static,
{
    let _ = behaviors; // retained on the type for documentation/tests; the
                        // worker's forwarding behavior is entirely driven by
                        // what the module returns.
    let mut state = module.init().await;
    let mut dist = Distributor::new();
    let mut inbox_state = InboxState::Open;
    let mut own_eoi_processed = false;
    let mut partners_reported = 0usize;

    loop {
        let done_signal = async {
            match &mut role {
                ConvergeRole::Leader { done_rx, .. } => done_rx.recv().await,
                _ => futures::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            signal = done_signal => {
                if signal.is_some() {
                    partners_reported += 1;
                    debug!(partners_reported, "convergence partner reported done");
                    if maybe_finish_group(&role, own_eoi_processed, partners_reported) {
                        finish_eoi(id, &next, &flow);
                        inbox_state = InboxState::DoneAnnounced;
                        break;
                    }
                }
            }

            msg = inbox.recv() => {
                match msg {
                    None => {
                        debug!("mailbox closed, exiting normally");
                        break;
                    }
                    Some(WorkerMsg::Input(input)) => {
                        if inbox_state != InboxState::Open {
                            let reason = ExitReason::InputAfterEoi { worker: id };
                            warn!(%reason, "rejecting input after end-of-input");
                            flow.send_died(reason);
                            break;
                        }
                        match module.handle_input(input, state).await {
                            Ok((outputs, next_state)) => {
                                state = next_state;
                                emit(id.phase, &next, &flow, &mut dist, outputs);
                            }
                            Err(err) => {
                                let reason = ExitReason::ModuleError {
                                    worker: id,
                                    message: err.0,
                                };
                                warn!(%reason, "phase module failed on handle_input");
                                flow.send_died(reason);
                                break;
                            }
                        }
                    }
                    Some(WorkerMsg::SyncInputs(batch, reply)) => {
                        if inbox_state != InboxState::Open {
                            let reason = ExitReason::InputAfterEoi { worker: id };
                            let _ = reply.send(Err(reason.clone()));
                            warn!(%reason, "rejecting synchronous batch after end-of-input");
                            flow.send_died(reason);
                            break;
                        }
                        match module.handle_sync_inputs(batch, state).await {
                            Ok((outputs, next_state)) => {
                                state = next_state;
                                emit(id.phase, &next, &flow, &mut dist, outputs);
                                let _ = reply.send(Ok(()));
                            }
                            Err(err) => {
                                let reason = ExitReason::ModuleError {
                                    worker: id,
                                    message: err.0,
                                };
                                let _ = reply.send(Err(reason.clone()));
                                warn!(%reason, "phase module failed on handle_sync_inputs");
                                flow.send_died(reason);
                                break;
                            }
                        }
                    }
                    Some(WorkerMsg::Eoi) => {
                        inbox_state = InboxState::DoneLocal;
                        match module.handle_inputs_done(state).await {
                            Ok((outputs, next_state)) => {
                                state = next_state;
                                emit(id.phase, &next, &flow, &mut dist, outputs);
                            }
                            Err(err) => {
                                let reason = ExitReason::ModuleError {
                                    worker: id,
                                    message: err.0,
                                };
                                warn!(%reason, "phase module failed on handle_inputs_done");
                                flow.send_died(reason);
                                break;
                            }
                        }
                        own_eoi_processed = true;
                        match &role {
                            ConvergeRole::Solo => {
                                finish_eoi(id, &next, &flow);
                                inbox_state = InboxState::DoneAnnounced;
                                break;
                            }
                            ConvergeRole::Member { leader_tx } => {
                                let _ = leader_tx.send(());
                                info!("convergence member reported done to leader");
                                inbox_state = InboxState::DoneAnnounced;
                                break;
                            }
                            ConvergeRole::Leader { .. } => {
                                if maybe_finish_group(&role, own_eoi_processed, partners_reported) {
                                    finish_eoi(id, &next, &flow);
                                    inbox_state = InboxState::DoneAnnounced;
                                    break;
                                }
                                // otherwise keep looping, waiting for partners
                            }
                        }
                    }
                }
            }
        }
    }
}

fn maybe_finish_group(role: &ConvergeRole, own_done: bool, partners_reported: usize) -> bool {
    match role {
        ConvergeRole::Leader { partner_count, .. } => own_done && partners_reported >= *partner_count,
        _ => own_done,
    }
}

fn finish_eoi<V>(id: WorkerId, next: &[WorkerHandle<V>], flow: &FlowEventHandle<V>) {
    if next.is_empty() {
        info!(worker = %id, "tail phase propagating completion to flow");
        flow.send_tail_done();
    } else {
        for handle in next {
            handle.send_eoi();
        }
    }
}

fn emit<V>(
    phase_id: PhaseId,
    next: &[WorkerHandle<V>],
    flow: &FlowEventHandle<V>,
    dist: &mut Distributor,
    outputs: Vec<V>,
) {
    if outputs.is_empty() {
        return;
    }
    if next.is_empty() {
        flow.send_results(phase_id, outputs);
        return;
    }
    if next.len() == 1 {
        for v in outputs {
            next[0].send_input(v);
        }
        return;
    }
    for v in outputs {
        let idx = dist.next_of(next.len()).expect("next is non-empty");
        next[idx].send_input(v);
    }
}
