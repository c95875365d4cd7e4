//! Client-facing commands accepted by a running [`Flow`](super::Flow) and the
//! handle the client holds to send them.

use tokio::sync::{mpsc, oneshot};

use flow_core::{FlowError, FlowId, NotFound, PhaseId};

pub(crate) enum FlowCommand<V> {
    AddInputs {
        batch: Vec<V>,
        reply: oneshot::Sender<Result<(), FlowError>>,
    },
    FinishInputs,
    GetPhases {
        reply: oneshot::Sender<Vec<PhaseId>>,
    },
    CachePut {
        key: String,
        value: V,
        reply: oneshot::Sender<()>,
    },
    CacheGet {
        key: String,
        reply: oneshot::Sender<Result<V, NotFound>>,
    },
}

/// The client's handle to a running flow. Cheaply `Clone`, so the same flow
/// can be fed from multiple tasks.
pub struct FlowHandle<V> {
    flow_id: FlowId,
    tx: mpsc::UnboundedSender<FlowCommand<V>>,
}

impl<V> Clone for FlowHandle<V> {
    fn clone(&self) -> Self {
        Self {
            flow_id: self.flow_id,
            tx: self.tx.clone(),
        }
    }
}

impl<V> FlowHandle<V> {
    pub(crate) fn new(flow_id: FlowId, tx: mpsc::UnboundedSender<FlowCommand<V>>) -> Self {
        Self { flow_id, tx }
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    /// Delivers `batch` to the head phase's synchronous input path. Returns
    /// once the head has accepted the batch, bounded by the flow's own
    /// timeout (enforced by the flow actor, not by this call itself).
    pub async fn add_inputs(&self, batch: Vec<V>) -> Result<(), FlowError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(FlowCommand::AddInputs {
                batch,
                reply: reply_tx,
            })
            .map_err(|_| FlowError::Closed(self.flow_id))?;
        reply_rx.await.unwrap_or(Err(FlowError::Closed(self.flow_id)))
    }

    /// Signals end-of-input to the head phase. Fire-and-forget: the flow's
    /// result stream (via `ResultCollector`) is what tells the client when
    /// the flow has actually finished.
    pub fn finish_inputs(&self) {
        let _ = self.tx.send(FlowCommand::FinishInputs);
    }

    /// Returns the pipeline's phase ids, in order. For tests.
    pub async fn get_phases(&self) -> Vec<PhaseId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(FlowCommand::GetPhases { reply: reply_tx }).is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub async fn cache_put(&self, key: impl Into<String>, value: V) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(FlowCommand::CachePut {
                key: key.into(),
                value,
                reply: reply_tx,
            })
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    pub async fn cache_get(&self, key: impl Into<String>) -> Result<V, NotFound> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(FlowCommand::CacheGet {
                key: key.into(),
                reply: reply_tx,
            })
            .is_err()
        {
            return Err(NotFound);
        }
        reply_rx.await.unwrap_or(Err(NotFound))
    }
}
