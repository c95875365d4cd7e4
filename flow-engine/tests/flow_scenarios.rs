//! End-to-end flow scenarios exercised against a live `Flow` rather than a
//! single actor in isolation.

use std::time::Duration;

use async_trait::async_trait;

use flow_engine::collector::{CollectError, CollectOutcome, ResultCollector};
use flow_engine::flow::{self, converging_phase, phase};
use flow_engine::modules::{EchoModule, FnStageModule, FoldModule};
use flow_engine::phase::module::{ModuleError, ModuleOutcome, PhaseModule};
use flow_engine::xformer::Xformer;
use flow_engine::{ExitReason, FlowError, FlowId, PhaseBehaviors, PhaseId};

/// A module whose `handle_input` fails the second time it is called.
struct CrashOnSecondInput;

#[async_trait]
impl PhaseModule<String> for CrashOnSecondInput {
    type State = u32;

    async fn init(&self) -> Self::State {
        0
    }

    async fn handle_input(&self, input: String, state: Self::State) -> ModuleOutcome<String, Self::State> {
        if state == 1 {
            return Err(ModuleError::new("boom"));
        }
        Ok((vec![input], state + 1))
    }
}

/// A module that never produces output and never signals done.
#[derive(Default)]
struct NeverCompletes;

#[async_trait]
impl PhaseModule<u32> for NeverCompletes {
    type State = ();

    async fn init(&self) -> Self::State {}

    async fn handle_input(&self, _input: u32, state: Self::State) -> ModuleOutcome<u32, Self::State> {
        Ok((Vec::new(), state))
    }
}

#[tokio::test]
async fn identity_pipeline_preserves_submission_order() {
    let pipeline = vec![phase(EchoModule, PhaseBehaviors::stage())];
    let (handle, client_rx) = flow::start(FlowId(1), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    handle.add_inputs(vec![1, 2, 3]).await.expect("accepted");
    handle.finish_inputs();

    let mut collector = ResultCollector::new(FlowId(1), client_rx);
    let outcome = collector.collect(Duration::from_secs(5)).await.expect("completes");
    assert_eq!(outcome, CollectOutcome::Single(vec![1, 2, 3]));
}

#[tokio::test]
async fn two_phase_map_composes_in_order() {
    let pipeline = vec![
        phase(FnStageModule::new(|x: i32| vec![x * 2]), PhaseBehaviors::stage()),
        phase(FnStageModule::new(|x: i32| vec![x + 1]), PhaseBehaviors::stage()),
    ];
    let (handle, client_rx) = flow::start(FlowId(2), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    handle.add_inputs(vec![1, 2, 3]).await.expect("accepted");
    handle.finish_inputs();

    let mut collector = ResultCollector::new(FlowId(2), client_rx);
    let outcome = collector.collect(Duration::from_secs(5)).await.expect("completes");
    assert_eq!(outcome, CollectOutcome::Single(vec![3, 5, 7]));
}

#[tokio::test]
async fn accumulate_reducer_emits_once_on_inputs_done() {
    let pipeline = vec![phase(
        FoldModule::new(0i32, |acc, x| acc + x),
        PhaseBehaviors::accumulate(),
    )];
    let (handle, client_rx) = flow::start(FlowId(3), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    handle.add_inputs(vec![1, 2, 3, 4]).await.expect("accepted");
    handle.finish_inputs();

    let mut collector = ResultCollector::new(FlowId(3), client_rx);
    let outcome = collector.collect(Duration::from_secs(5)).await.expect("completes");
    assert_eq!(outcome, CollectOutcome::Single(vec![10]));
}

#[tokio::test]
async fn converging_phase_emits_exactly_one_done_with_all_inputs() {
    let pipeline = vec![
        converging_phase(EchoModule, 3).expect("valid peer count"),
        phase(EchoModule, PhaseBehaviors::stage()),
    ];
    let (handle, client_rx) = flow::start(FlowId(4), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    let inputs = ["a", "b", "c", "d", "e", "f"];
    let batch: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
    handle.add_inputs(batch).await.expect("accepted");
    handle.finish_inputs();

    let mut collector = ResultCollector::new(FlowId(4), client_rx);
    let outcome = collector.collect(Duration::from_secs(5)).await.expect("completes");
    let mut got = match outcome {
        CollectOutcome::Single(v) => v,
        CollectOutcome::Multi(_) => panic!("only the tail phase should emit results"),
    };
    got.sort();
    let mut expected: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(got, expected);
}

#[tokio::test(start_paused = true)]
async fn flow_timeout_is_honoured_when_a_phase_never_completes() {
    let pipeline = vec![phase(NeverCompletes, PhaseBehaviors::stage())];
    let (handle, client_rx) = flow::start(
        FlowId(5),
        pipeline,
        Xformer::identity(),
        Duration::from_millis(100),
    )
    .await
    .expect("flow starts");

    handle.add_inputs(vec![1, 2, 3]).await.expect("accepted");
    // deliberately never call finish_inputs

    let mut collector = ResultCollector::new(FlowId(5), client_rx);
    let outcome = collector.collect(Duration::from_millis(200)).await;
    match outcome {
        Err(CollectError::Flow(FlowError::Timeout)) => {}
        other => panic!("expected a flow timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn phase_crash_terminates_with_error_not_done() {
    let pipeline = vec![phase(CrashOnSecondInput, PhaseBehaviors::stage())];
    let (handle, client_rx) = flow::start(FlowId(6), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    // Deliver one at a time so the worker actually observes three
    // sequential `handle_input` calls instead of folding them via the
    // synchronous batch fast path.
    let _ = handle.add_inputs(vec!["ok".to_string()]).await;
    let _ = handle.add_inputs(vec!["boom".to_string()]).await;
    let _ = handle.add_inputs(vec!["ok".to_string()]).await;
    handle.finish_inputs();

    let mut collector = ResultCollector::new(FlowId(6), client_rx);
    let outcome = collector.collect(Duration::from_secs(5)).await;
    match outcome {
        Err(CollectError::Flow(FlowError::Phase(ExitReason::ModuleError { .. }))) => {}
        other => panic!("expected a phase error, got {other:?}"),
    }
}

#[tokio::test]
async fn phase_ids_are_tagged_head_to_tail() {
    let pipeline = vec![
        phase(FnStageModule::new(|x: i32| vec![x]), PhaseBehaviors::stage()),
        phase(FnStageModule::new(|x: i32| vec![x]), PhaseBehaviors::stage()),
        phase(FnStageModule::new(|x: i32| vec![x]), PhaseBehaviors::stage()),
    ];
    let (handle, _client_rx) = flow::start(FlowId(7), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    let ids = handle.get_phases().await;
    assert_eq!(ids, vec![PhaseId(0), PhaseId(1), PhaseId(2)]);
    handle.finish_inputs();
}

#[tokio::test]
async fn cache_put_then_get_is_idempotent_until_termination() {
    let pipeline = vec![phase(EchoModule, PhaseBehaviors::stage())];
    let (handle, _client_rx) = flow::start(FlowId(8), pipeline, Xformer::identity(), Duration::from_secs(5))
        .await
        .expect("flow starts");

    handle.cache_put("k", 42i32).await;
    assert_eq!(handle.cache_get("k").await, Ok(42));
    assert_eq!(handle.cache_get("k").await, Ok(42));
    assert!(handle.cache_get("missing").await.is_err());

    handle.finish_inputs();
}
