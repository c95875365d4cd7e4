//! [`ResultCollector`]: a pure client-side accumulator over a flow's result
//! stream.

use std::collections::BTreeMap;
use std::time::Duration;

use flow_core::{CollectTimeout, FlowError, FlowId, PhaseId};

use crate::client::{ClientMessage, ClientReceiver};

/// The shape `ResultCollector::finalize` returns: a single phase's flat
/// sequence, or the per-phase sequences of a multi-phase pipeline, ordered
/// by ascending `phase_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome<V> {
    Single(Vec<V>),
    Multi(Vec<Vec<V>>),
}

/// Everything that can end a collection early without a normal `done`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollectError {
    /// The per-collect timeout elapsed with nothing accumulated yet.
    #[error(transparent)]
    Timeout(#[from] CollectTimeout),
    /// The flow reported a terminal error.
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Drains a flow's [`ClientReceiver`] into an ordered, per-phase
/// accumulation.
pub struct ResultCollector<V> {
    flow_id: FlowId,
    receiver: ClientReceiver<V>,
    accum: BTreeMap<PhaseId, Vec<Vec<V>>>,
}

impl<V> ResultCollector<V> {
    pub fn new(flow_id: FlowId, receiver: ClientReceiver<V>) -> Self {
        Self {
            flow_id,
            receiver,
            accum: BTreeMap::new(),
        }
    }

    /// Collects results until the flow's terminal message arrives or
    /// `per_collect_timeout` elapses since the last message was received.
    pub async fn collect(
        &mut self,
        per_collect_timeout: Duration,
    ) -> Result<CollectOutcome<V>, CollectError> {
        loop {
            match tokio::time::timeout(per_collect_timeout, self.receiver.recv()).await {
                Ok(Some(ClientMessage::Results { phase_id, batch, .. })) => {
                    self.accum.entry(phase_id).or_default().push(batch);
                }
                Ok(Some(ClientMessage::Done { .. })) => return Ok(self.finalize()),
                Ok(Some(ClientMessage::Error { error, .. })) => return Err(error.into()),
                Ok(None) => return Err(FlowError::Closed(self.flow_id).into()),
                Err(_elapsed) => {
                    if self.accum.is_empty() {
                        return Err(CollectTimeout.into());
                    }
                    return Ok(self.finalize());
                }
            }
        }
    }

    fn finalize(&mut self) -> CollectOutcome<V> {
        let mut sequences: Vec<Vec<V>> = Vec::with_capacity(self.accum.len());
        for (_, batches) in std::mem::take(&mut self.accum) {
            sequences.push(batches.into_iter().flatten().collect());
        }
        if sequences.len() == 1 {
            CollectOutcome::Single(sequences.into_iter().next().expect("len == 1"))
        } else {
            CollectOutcome::Multi(sequences)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::client_channel;
    use flow_core::PhaseId;

    #[tokio::test]
    async fn finalize_flattens_single_phase_to_a_flat_sequence() {
        let (tx, rx) = client_channel::<u32>();
        let flow_id = FlowId(1);
        let mut collector = ResultCollector::new(flow_id, rx);

        tx.send_results(flow_id, PhaseId(0), vec![1, 2]);
        tx.send_results(flow_id, PhaseId(0), vec![3]);
        tx.send_done(flow_id);

        let outcome = collector.collect(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome, CollectOutcome::Single(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn finalize_orders_multiple_phases_ascending() {
        let (tx, rx) = client_channel::<u32>();
        let flow_id = FlowId(2);
        let mut collector = ResultCollector::new(flow_id, rx);

        tx.send_results(flow_id, PhaseId(1), vec![20]);
        tx.send_results(flow_id, PhaseId(0), vec![10]);
        tx.send_done(flow_id);

        let outcome = collector.collect(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome, CollectOutcome::Multi(vec![vec![10], vec![20]]));
    }

    #[tokio::test]
    async fn flow_error_is_propagated() {
        let (tx, rx) = client_channel::<u32>();
        let flow_id = FlowId(3);
        let mut collector = ResultCollector::new(flow_id, rx);

        tx.send_error(flow_id, FlowError::Timeout);

        let err = collector.collect(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CollectError::Flow(FlowError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_collect_timeout_is_an_error() {
        let (_tx, rx) = client_channel::<u32>();
        let flow_id = FlowId(4);
        let mut collector = ResultCollector::new(flow_id, rx);

        let err = collector
            .collect(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn nonempty_collect_timeout_finalizes_what_was_accumulated() {
        let (tx, rx) = client_channel::<u32>();
        let flow_id = FlowId(5);
        let mut collector = ResultCollector::new(flow_id, rx);

        tx.send_results(flow_id, PhaseId(0), vec![7]);

        let outcome = collector
            .collect(Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(outcome, CollectOutcome::Single(vec![7]));
    }
}
