//! The `Flow` actor: owns a pipeline, routes inputs to its head,
//! receives phase results, enforces a wall-clock timeout, and reports to its
//! client through exactly one terminal message.

pub mod builder;
mod requests;

use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{info, warn};
use tracing_futures::Instrument;

use flow_core::{FlowError, FlowId, PhaseId, StartError};

use crate::cache::FlowCache;
use crate::client::{client_channel, ClientSender};
use crate::link::{flow_event_channel, FlowEvent};
use crate::phase::distribute::Distributor;
use crate::xformer::Xformer;

pub use builder::{converging_phase, phase, PipelineStep};
pub use requests::FlowHandle;

use builder::build_pipeline;
use requests::FlowCommand;

/// Starts a flow: builds its pipeline tail-to-head, spawns the `Flow` actor
/// task, and returns the client's handle plus its result stream.
///
/// On [`StartError`] no task is left running: any worker already spawned
/// while building the rest of the pipeline has been aborted.
pub async fn start<V>(
    flow_id: FlowId,
    pipeline: Vec<PipelineStep<V>>,
    xformer: Xformer<V>,
    flow_timeout: Duration,
) -> Result<(FlowHandle<V>, crate::client::ClientReceiver<V>), StartError>
where
    V: Clone + Send + 'static,
{
    let (flow_events_tx, flow_events_rx) = flow_event_channel();
    let built = build_pipeline(flow_id, pipeline, flow_events_tx)?;

    let (client_tx, client_rx) = client_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let span = tracing::info_span!("flow", flow = %flow_id);
    tokio::spawn(
        run(
            flow_id,
            built.head,
            built.phase_ids,
            built.tasks,
            command_rx,
            flow_events_rx,
            client_tx,
            xformer,
            flow_timeout,
        )
        .instrument(span),
    );

    Ok((FlowHandle::new(flow_id, command_tx), client_rx))
}

fn panic_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "worker panicked with a non-string payload".to_string()
        }
    } else {
        "worker task was cancelled".to_string()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run<V>(
    flow_id: FlowId,
    head: Vec<crate::link::WorkerHandle<V>>,
    phase_ids: Vec<PhaseId>,
    tasks: Vec<(flow_core::WorkerId, tokio::task::JoinHandle<()>)>,
    mut commands: mpsc::UnboundedReceiver<FlowCommand<V>>,
    mut events: mpsc::UnboundedReceiver<FlowEvent<V>>,
    client: ClientSender<V>,
    xformer: Xformer<V>,
    flow_timeout: Duration,
) where
    V: Clone + Send + 'static,
{
    let abort_handles: Vec<tokio::task::AbortHandle> =
        tasks.iter().map(|(_, h)| h.abort_handle()).collect();
    let mut supervised: FuturesUnordered<_> = tasks
        .into_iter()
        .map(|(id, handle)| async move { (id, handle.await) })
        .collect();

    let mut cache = FlowCache::<V>::new();
    let mut head_dist = Distributor::new();

    let sleep = tokio::time::sleep(flow_timeout);
    tokio::pin!(sleep);

    let terminal = loop {
        tokio::select! {
            biased;

            _ = &mut sleep => {
                warn!("flow timed out");
                break Err(FlowError::Timeout);
            }

            Some(cmd) = commands.recv() => {
                match cmd {
                    FlowCommand::AddInputs { batch, reply } => {
                        let result = deliver_to_head(&head, &mut head_dist, batch).await;
                        let _ = reply.send(result);
                    }
                    FlowCommand::FinishInputs => {
                        for member in &head {
                            member.send_eoi();
                        }
                    }
                    FlowCommand::GetPhases { reply } => {
                        let _ = reply.send(phase_ids.clone());
                    }
                    FlowCommand::CachePut { key, value, reply } => {
                        cache.put(key, value);
                        let _ = reply.send(());
                    }
                    FlowCommand::CacheGet { key, reply } => {
                        let result = cache.get(&key).ok_or(flow_core::NotFound);
                        let _ = reply.send(result);
                    }
                }
            }

            Some(event) = events.recv() => {
                match event {
                    FlowEvent::Results { phase_id, batch } => {
                        client.send_results(flow_id, phase_id, xformer.apply(batch));
                    }
                    FlowEvent::TailDone => {
                        info!("flow completed normally");
                        break Ok(());
                    }
                    FlowEvent::WorkerDied { reason } => {
                        warn!(%reason, "flow failed: worker died abnormally");
                        break Err(FlowError::Phase(reason));
                    }
                }
            }

            Some((id, result)) = supervised.next(), if !supervised.is_empty() => {
                if let Err(join_err) = result {
                    let reason = flow_core::ExitReason::ModulePanic {
                        worker: id,
                        message: panic_message(join_err),
                    };
                    warn!(%reason, "flow failed: worker task panicked");
                    break Err(FlowError::Phase(reason));
                }
                // A worker exiting normally without the tail ever reporting
                // completion is surprising but not itself fatal (design note,
                // open question (b) — preserved as specified).
                warn!(worker = %id, "worker task exited normally before flow completion");
            }
        }
    };

    for handle in &abort_handles {
        handle.abort();
    }

    match terminal {
        Ok(()) => client.send_done(flow_id),
        Err(error) => client.send_error(flow_id, error),
    }
}

async fn deliver_to_head<V>(
    head: &[crate::link::WorkerHandle<V>],
    dist: &mut Distributor,
    batch: Vec<V>,
) -> Result<(), FlowError> {
    if head.is_empty() {
        return Ok(());
    }
    if head.len() == 1 {
        return head[0].send_sync_inputs(batch).await.map_err(FlowError::Phase);
    }
    // A converging head is `N` physical workers, one datum per member; split
    // the batch per element across the group rather than concentrating it on
    // whichever member a single distributor pick would land on.
    for item in batch {
        let idx = dist.next_of(head.len()).expect("head is non-empty");
        head[idx]
            .send_sync_inputs(vec![item])
            .await
            .map_err(FlowError::Phase)?;
    }
    Ok(())
}
