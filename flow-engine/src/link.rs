//! The channel types that connect workers to each other and to their flow.
//!
//! Grounded on the source's `state_machine::requests` / `state_machine::events`
//! split: a `Sender`/`Receiver` pair per direction, with the sender side
//! cheaply `Clone`-able and exposing only the operations its caller is
//! allowed to perform.

use tokio::sync::{mpsc, oneshot};

use flow_core::{ExitReason, PhaseId, WorkerId};

/// A message sent to one `PhaseWorker`'s mailbox.
pub(crate) enum WorkerMsg<V> {
    /// One input, forwarded by the previous phase's worker.
    Input(V),
    /// A batch submitted synchronously (`Flow::add_inputs` targets the head).
    /// The reply channel is satisfied once the batch has been accepted,
    /// i.e. handed to the module's `handle_sync_inputs`.
    SyncInputs(Vec<V>, oneshot::Sender<Result<(), ExitReason>>),
    /// End-of-input, propagated from the previous phase (or from the flow,
    /// for the head phase).
    Eoi,
}

/// The send half of a worker's mailbox, held by whoever forwards to it: the
/// previous phase's workers, or the flow for the head phase.
pub(crate) struct WorkerHandle<V> {
    tx: mpsc::UnboundedSender<WorkerMsg<V>>,
}

impl<V> Clone for WorkerHandle<V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<V> WorkerHandle<V> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<WorkerMsg<V>>) -> Self {
        Self { tx }
    }

    pub(crate) fn send_input(&self, input: V) {
        // An error here means the worker's mailbox is gone, which only
        // happens after it has already reported its own exit reason to the
        // flow; dropping the input silently is correct since the flow is
        // already tearing down.
        let _ = self.tx.send(WorkerMsg::Input(input));
    }

    pub(crate) fn send_eoi(&self) {
        let _ = self.tx.send(WorkerMsg::Eoi);
    }

    pub(crate) async fn send_sync_inputs(&self, batch: Vec<V>) -> Result<(), ExitReason> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(WorkerMsg::SyncInputs(batch, reply_tx)).is_err() {
            return Err(ExitReason::ForwardingFailed {
                worker: WorkerId {
                    phase: PhaseId(0),
                    member: 0,
                },
                message: "head worker mailbox closed".into(),
            });
        }
        reply_rx.await.unwrap_or(Err(ExitReason::ForwardingFailed {
            worker: WorkerId {
                phase: PhaseId(0),
                member: 0,
            },
            message: "head worker dropped the reply channel".into(),
        }))
    }
}

pub(crate) fn worker_channel<V>() -> (WorkerHandle<V>, mpsc::UnboundedReceiver<WorkerMsg<V>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WorkerHandle::new(tx), rx)
}

/// A message sent from a worker (or convergence group) up to its flow.
pub(crate) enum FlowEvent<V> {
    /// A batch of results produced by the phase at `phase_id`.
    Results { phase_id: PhaseId, batch: Vec<V> },
    /// The tail phase has observed and propagated end-of-input.
    TailDone,
    /// A worker exited abnormally.
    WorkerDied { reason: ExitReason },
}

/// The send half of a flow's event mailbox, cloned into every worker it
/// spawns.
pub(crate) struct FlowEventHandle<V> {
    tx: mpsc::UnboundedSender<FlowEvent<V>>,
}

impl<V> Clone for FlowEventHandle<V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<V> FlowEventHandle<V> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<FlowEvent<V>>) -> Self {
        Self { tx }
    }

    pub(crate) fn send_results(&self, phase_id: PhaseId, batch: Vec<V>) {
        if batch.is_empty() {
            return;
        }
        let _ = self.tx.send(FlowEvent::Results { phase_id, batch });
    }

    pub(crate) fn send_tail_done(&self) {
        let _ = self.tx.send(FlowEvent::TailDone);
    }

    pub(crate) fn send_died(&self, reason: ExitReason) {
        let _ = self.tx.send(FlowEvent::WorkerDied { reason });
    }
}

pub(crate) fn flow_event_channel<V>(
) -> (FlowEventHandle<V>, mpsc::UnboundedReceiver<FlowEvent<V>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FlowEventHandle::new(tx), rx)
}

/// A convergence group member's notification to its leader: "I am done."
pub(crate) type ConvergeDoneTx = mpsc::UnboundedSender<()>;
pub(crate) type ConvergeDoneRx = mpsc::UnboundedReceiver<()>;

pub(crate) fn converge_done_channel() -> (ConvergeDoneTx, ConvergeDoneRx) {
    mpsc::unbounded_channel()
}
