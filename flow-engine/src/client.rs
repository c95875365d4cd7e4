//! Messages a [`Flow`](crate::flow::Flow) sends back to the client that
//! started it, and the channel pair carrying them.

use tokio::sync::mpsc;

use flow_core::{FlowError, FlowId, PhaseId};

/// One message in a flow's result stream, as consumed by a
/// [`ResultCollector`](crate::collector::ResultCollector).
#[derive(Debug)]
pub enum ClientMessage<V> {
    /// `{flow_results, phase_id, flow_id, result}`: a batch of (already
    /// `xformer`-transformed) results from one phase.
    Results {
        flow_id: FlowId,
        phase_id: PhaseId,
        batch: Vec<V>,
    },
    /// `{flow_results, flow_id, done}`: the flow completed normally. Always
    /// the last message on this stream.
    Done { flow_id: FlowId },
    /// `{flow_error, flow_id, reason}`: the flow terminated abnormally.
    /// Always the last message on this stream.
    Error { flow_id: FlowId, error: FlowError },
}

/// The send half of a flow's result stream, held by the `Flow` actor.
pub(crate) struct ClientSender<V> {
    tx: mpsc::UnboundedSender<ClientMessage<V>>,
}

impl<V> Clone for ClientSender<V> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<V> ClientSender<V> {
    pub(crate) fn send_results(&self, flow_id: FlowId, phase_id: PhaseId, batch: Vec<V>) {
        if batch.is_empty() {
            return;
        }
        let _ = self.tx.send(ClientMessage::Results {
            flow_id,
            phase_id,
            batch,
        });
    }

    pub(crate) fn send_done(&self, flow_id: FlowId) {
        let _ = self.tx.send(ClientMessage::Done { flow_id });
    }

    pub(crate) fn send_error(&self, flow_id: FlowId, error: FlowError) {
        let _ = self.tx.send(ClientMessage::Error { flow_id, error });
    }
}

/// The receive half of a flow's result stream, held by the client (typically
/// wrapped in a [`ResultCollector`](crate::collector::ResultCollector)).
pub struct ClientReceiver<V> {
    rx: mpsc::UnboundedReceiver<ClientMessage<V>>,
}

impl<V> ClientReceiver<V> {
    pub async fn recv(&mut self) -> Option<ClientMessage<V>> {
        self.rx.recv().await
    }
}

pub(crate) fn client_channel<V>() -> (ClientSender<V>, ClientReceiver<V>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ClientSender { tx }, ClientReceiver { rx })
}
