//! A small host process that wires one of the reference pipelines and
//! drives it from stdin, for manual exercising of the flow coordinator.

use std::path::PathBuf;

use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use flow_core::{FlowId, PhaseBehaviors};
use flow_engine::app::{drain, signal};
use flow_engine::collector::ResultCollector;
use flow_engine::flow::{self, converging_phase, phase, PipelineStep};
use flow_engine::modules::{EchoModule, FnStageModule, FoldModule};
use flow_engine::settings::{PipelineShape, Settings};
use flow_engine::xformer::Xformer;

#[derive(StructOpt)]
#[structopt(name = "flow-demo", about = "Drives a reference pipeline from stdin")]
struct Opt {
    /// Path to a settings TOML file.
    #[structopt(long, default_value = "flow-engine/config.toml")]
    config: PathBuf,
}

fn build_pipeline(shape: PipelineShape) -> Vec<PipelineStep<String>> {
    match shape {
        PipelineShape::Echo => vec![phase(EchoModule, PhaseBehaviors::stage())],
        PipelineShape::Uppercase => vec![
            phase(
                FnStageModule::new(|line: String| {
                    line.split_whitespace().map(str::to_string).collect()
                }),
                PhaseBehaviors::stage(),
            ),
            phase(
                FnStageModule::new(|word: String| vec![word.to_uppercase()]),
                PhaseBehaviors::stage(),
            ),
        ],
        PipelineShape::WordCount { converge } => {
            let counter = FoldModule::new("0".to_string(), |acc: String, _word: String| {
                let count: u64 = acc.parse().unwrap_or(0);
                (count + 1).to_string()
            });
            vec![converging_phase(counter, converge).expect("invalid converge count")]
        }
    }
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::new(&opt.config).expect("failed to load settings");
    let pipeline = build_pipeline(settings.flow.pipeline);
    let flow_id = FlowId(1);

    let (handle, client_rx) = flow::start(
        flow_id,
        pipeline,
        Xformer::identity(),
        settings.flow.flow_timeout,
    )
    .await
    .expect("failed to start flow");

    let (drain_signal, mut drain_watch) = drain::channel();

    let feeder = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut batch = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    _ = drain_watch.signaled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            batch.push(line);
                            if batch.len() == 16 {
                                let _ = handle.add_inputs(std::mem::take(&mut batch)).await;
                            }
                        }
                        _ => break,
                    },
                }
            }
            if !batch.is_empty() {
                let _ = handle.add_inputs(batch).await;
            }
            handle.finish_inputs();
        })
    };

    let mut collector = ResultCollector::new(flow_id, client_rx);
    tokio::select! {
        outcome = collector.collect(settings.flow.flow_timeout) => {
            match outcome {
                Ok(result) => tracing::info!(?result, "flow completed"),
                Err(error) => tracing::error!(%error, "flow failed"),
            }
        }
        _ = signal::wait_for_shutdown() => {
            tracing::info!("shutting down before flow completed");
        }
    }

    // Tells the feeder to stop reading stdin even if it is still blocked on
    // input, so it can be joined promptly regardless of why the select above
    // resolved.
    drain_signal.drain();
    let _ = feeder.await;
}
