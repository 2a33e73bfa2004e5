//! Execution strategies: the seam between the engine and real execution.
//!
//! The engine never runs the structure under test itself. A [`Strategy`]
//! owns one scenario and produces, per invocation, either the observed
//! results or a failure it detected on its own (deadlock, escaped
//! exception, validation error, blocked thread). Invocations are blocking
//! calls with no preemption: the planner accepts a bounded deadline overrun
//! instead of cancelling an in-flight invocation.

use linearix_core::{ExecutionResult, ExecutionScenario, InterleavingTrace, TestFailure};

use crate::error::EngineError;
use crate::model::SequentialModel;
use crate::planner::TestingMode;
use crate::verifier::replay_sequentially;

/// What one invocation produced.
///
/// `Results` still needs verification; `Failure` is already a verdict the
/// strategy reached on its own and bypasses the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The invocation completed and these results were observed.
    Results(ExecutionResult),
    /// The strategy itself detected a failure.
    Failure(TestFailure),
}

/// Executes one scenario, one invocation at a time.
///
/// A strategy is created per (mode, scenario) pair by a [`StrategyFactory`]
/// and dropped when the iteration ends.
pub trait Strategy {
    /// Run one invocation to completion. Blocking; never preempted.
    ///
    /// `Err` means the strategy itself broke (worker setup, instrumentation),
    /// not that the structure under test failed.
    fn run_invocation(&mut self) -> Result<InvocationOutcome, EngineError>;

    /// Trace of the most recent invocation, when this strategy records one.
    ///
    /// Consulted by the orchestrator to enrich an `IncorrectResults` failure
    /// it builds from a `Results` outcome.
    fn last_trace(&self) -> Option<InterleavingTrace> {
        None
    }
}

/// Creates strategies for (mode, scenario) pairs.
pub trait StrategyFactory {
    /// Build a strategy to run `scenario` under `mode`.
    fn create(
        &self,
        mode: TestingMode,
        scenario: &ExecutionScenario,
    ) -> Result<Box<dyn Strategy>, EngineError>;

    /// Whether strategies built for `mode` capture interleaving traces.
    ///
    /// Gates the trace-reproduction pass: a failure found under a traceless
    /// mode is re-reproduced under the other mode only when that mode
    /// captures traces.
    fn supports_trace_capture(&self, _mode: TestingMode) -> bool {
        false
    }
}

/// Strategy that replays the scenario single-threaded against a sequential
/// model, thread 0 first.
///
/// Deterministic and trivially linearizable; useful as a baseline and in
/// round-trip tests.
pub struct SequentialStrategy<M: SequentialModel> {
    model: M,
    scenario: ExecutionScenario,
}

impl<M: SequentialModel> SequentialStrategy<M> {
    /// Create a strategy replaying `scenario` against a copy of `model`.
    pub fn new(model: M, scenario: ExecutionScenario) -> Self {
        Self { model, scenario }
    }
}

impl<M: SequentialModel> Strategy for SequentialStrategy<M> {
    fn run_invocation(&mut self) -> Result<InvocationOutcome, EngineError> {
        let results = replay_sequentially(&self.model, &self.scenario)?;
        Ok(InvocationOutcome::Results(results))
    }
}

/// Factory producing [`SequentialStrategy`] instances from one base model.
pub struct SequentialStrategyFactory<M: SequentialModel> {
    model: M,
}

impl<M: SequentialModel> SequentialStrategyFactory<M> {
    /// Factory whose strategies replay against copies of `model`.
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: SequentialModel + 'static> StrategyFactory for SequentialStrategyFactory<M> {
    fn create(
        &self,
        _mode: TestingMode,
        scenario: &ExecutionScenario,
    ) -> Result<Box<dyn Strategy>, EngineError> {
        Ok(Box::new(SequentialStrategy::new(
            self.model.clone(),
            scenario.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linearix_core::{Actor, OpResult, OperationId, Value};

    use crate::error::ModelError;
    use crate::verifier::LinearizabilityVerifier;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
    struct Register(i64);

    impl SequentialModel for Register {
        fn apply(&mut self, actor: &Actor) -> Result<OpResult, ModelError> {
            match actor.op.as_usize() {
                0 => {
                    let Some(Value::Int(v)) = actor.args.first() else {
                        return Err(ModelError::new("write", "missing argument"));
                    };
                    self.0 = *v;
                    Ok(OpResult::Void)
                }
                _ => Ok(OpResult::Value(Value::Int(self.0))),
            }
        }
    }

    fn write(v: i64) -> Actor {
        Actor::new(OperationId::new(0), vec![Value::Int(v)])
    }

    fn read() -> Actor {
        Actor::new(OperationId::new(1), vec![])
    }

    #[test]
    fn test_sequential_strategy_round_trips_through_verifier() {
        let scenario = ExecutionScenario::new(
            vec![write(1)],
            vec![vec![write(2), read()], vec![read()]],
            vec![read()],
        );
        let factory = SequentialStrategyFactory::new(Register::default());
        let mut strategy = factory.create(TestingMode::Stress, &scenario).unwrap();
        let InvocationOutcome::Results(results) = strategy.run_invocation().unwrap() else {
            panic!("sequential strategy never fails");
        };
        let mut verifier = LinearizabilityVerifier::new(Register::default());
        assert!(verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_sequential_strategy_is_deterministic() {
        let scenario =
            ExecutionScenario::new(vec![], vec![vec![write(7), read()]], vec![]);
        let mut strategy = SequentialStrategy::new(Register::default(), scenario);
        let first = strategy.run_invocation().unwrap();
        let second = strategy.run_invocation().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_factory_captures_no_traces() {
        let factory = SequentialStrategyFactory::new(Register::default());
        assert!(!factory.supports_trace_capture(TestingMode::ModelChecking));
    }
}
