//! Reference phase modules: demonstration and test
//! modules covering the kinds of phase a pipeline typically needs. A host is
//! free to supply any type implementing [`PhaseModule`] instead.

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::phase::module::{ModuleOutcome, PhaseModule};

/// Wraps `f: Fn(V) -> Vec<V>` as a `stage` module: one input may produce
/// zero, one, or many outputs. Covers "map" and general custom phases.
pub struct FnStageModule<V, F> {
    f: F,
    _value: PhantomData<fn(V)>,
}

impl<V, F> FnStageModule<V, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _value: PhantomData,
        }
    }
}

#[async_trait]
impl<V, F> PhaseModule<V> for FnStageModule<V, F>
where
    V: Send + 'static,
    F: Fn(V) -> Vec<V> + Send + Sync + 'static,
{
    type State = ();

    async fn init(&self) -> Self::State {}

    async fn handle_input(&self, input: V, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok(((self.f)(input), state))
    }
}

/// Wraps an associative `fold: Fn(Acc, V) -> Acc` as an `accumulate` module:
/// inputs are folded silently and the single accumulated value is emitted
/// only once `handle_inputs_done` fires. Covers "reduce".
pub struct FoldModule<V, F> {
    seed: V,
    fold: F,
}

impl<V, F> FoldModule<V, F> {
    pub fn new(seed: V, fold: F) -> Self {
        Self { seed, fold }
    }
}

#[async_trait]
impl<V, F> PhaseModule<V> for FoldModule<V, F>
where
    V: Clone + Send + 'static,
    F: Fn(V, V) -> V + Send + Sync + 'static,
{
    type State = V;

    async fn init(&self) -> Self::State {
        self.seed.clone()
    }

    async fn handle_input(&self, input: V, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok((Vec::new(), (self.fold)(state, input)))
    }

    async fn handle_inputs_done(&self, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok((vec![state.clone()], state))
    }
}

/// Wraps `f: Fn(V) -> Option<V>` as a `stage` module that may drop an input
/// (`None`) or forward it, possibly transformed (`Some`). Covers "link"-style
/// selective forwarding.
pub struct FilterMapModule<V, F> {
    f: F,
    _value: PhantomData<fn(V)>,
}

impl<V, F> FilterMapModule<V, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _value: PhantomData,
        }
    }
}

#[async_trait]
impl<V, F> PhaseModule<V> for FilterMapModule<V, F>
where
    V: Send + 'static,
    F: Fn(V) -> Option<V> + Send + Sync + 'static,
{
    type State = ();

    async fn init(&self) -> Self::State {}

    async fn handle_input(&self, input: V, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok(((self.f)(input).into_iter().collect(), state))
    }
}

/// The identity module: forwards every input unchanged.
#[derive(Debug, Default)]
pub struct EchoModule;

#[async_trait]
impl<V> PhaseModule<V> for EchoModule
where
    V: Send + 'static,
{
    type State = ();

    async fn init(&self) -> Self::State {}

    async fn handle_input(&self, input: V, state: Self::State) -> ModuleOutcome<V, Self::State> {
        Ok((vec![input], state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_forwards_unchanged() {
        let module = EchoModule;
        let state = module.init().await;
        let (outputs, _) = module.handle_input(7, state).await.unwrap();
        assert_eq!(outputs, vec![7]);
    }

    #[tokio::test]
    async fn fn_stage_can_fan_out() {
        let module = FnStageModule::new(|n: u32| vec![n, n]);
        let state = module.init().await;
        let (outputs, _) = module.handle_input(3, state).await.unwrap();
        assert_eq!(outputs, vec![3, 3]);
    }

    #[tokio::test]
    async fn fold_emits_only_on_inputs_done() {
        let module = FoldModule::new(0u32, |acc, x| acc + x);
        let mut state = module.init().await;
        for n in [1, 2, 3] {
            let (outputs, next_state) = module.handle_input(n, state).await.unwrap();
            assert!(outputs.is_empty());
            state = next_state;
        }
        let (outputs, _) = module.handle_inputs_done(state).await.unwrap();
        assert_eq!(outputs, vec![6]);
    }

    #[tokio::test]
    async fn filter_map_drops_none() {
        let module = FilterMapModule::new(|n: u32| if n % 2 == 0 { Some(n) } else { None });
        let state = module.init().await;
        let (outputs, state) = module.handle_input(3, state).await.unwrap();
        assert!(outputs.is_empty());
        let (outputs, _) = module.handle_input(4, state).await.unwrap();
        assert_eq!(outputs, vec![4]);
    }
}
