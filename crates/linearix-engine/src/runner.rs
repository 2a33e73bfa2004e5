//! Campaign orchestration.
//!
//! A campaign wires the collaborators together: scenarios come from the
//! generator (custom ones first), each scenario runs for one planner-bounded
//! iteration under a strategy, every completed invocation's results go
//! through the linearizability verifier, and the first failure stops the
//! run. The failure is then optionally minimized and re-reproduced under the
//! other execution mode to attach a richer interleaving trace.

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use linearix_core::{
    ExecutionScenario, FailureKind, OperationCatalog, TestFailure,
};

use crate::error::EngineError;
use crate::generator::{ExecutionGenerator, GeneratorOptions, RandomExecutionGenerator};
use crate::minimizer::{self, MinimizationContext};
use crate::model::SequentialModel;
use crate::planner::{AdaptivePlanner, FixedInvocationsPlanner, Planner, TestingMode};
use crate::strategy::{InvocationOutcome, StrategyFactory};
use crate::tracker::RunTracker;
use crate::verifier::LinearizabilityVerifier;

/// Fraction of a hybrid campaign's budget spent in stress mode before
/// switching to model checking.
pub const HYBRID_STRESS_BUDGET_FRACTION: f64 = 0.25;

/// Invocations given to a custom scenario that does not pin its own count.
pub const DEFAULT_CUSTOM_SCENARIO_INVOCATIONS: usize = 1_000;

/// Which execution modes a campaign spends its budget on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The whole budget runs under the stress strategy.
    Stress,
    /// The whole budget runs under the model-checking strategy.
    ModelChecking,
    /// Stress first for [`HYBRID_STRESS_BUDGET_FRACTION`] of the budget,
    /// model checking for the remainder.
    Hybrid,
}

/// A user-pinned scenario, run before any generated ones.
#[derive(Debug, Clone)]
pub struct CustomScenario {
    /// The scenario to run, validated before use.
    pub scenario: ExecutionScenario,
    /// Invocation count; `None` uses
    /// [`DEFAULT_CUSTOM_SCENARIO_INVOCATIONS`].
    pub invocations: Option<usize>,
}

/// Everything configurable about one campaign.
#[derive(Debug, Clone)]
pub struct CampaignOptions {
    /// Wall-clock budget for the generated-scenario part of the run.
    pub testing_time: Duration,
    /// Execution mode split.
    pub mode: RunMode,
    /// Parallel thread count range for generated scenarios.
    pub threads: RangeInclusive<usize>,
    /// Operations per part for generated scenarios.
    pub operations_per_thread: RangeInclusive<usize>,
    /// Whether generated scenarios carry an init part.
    pub generate_init: bool,
    /// Whether generated scenarios carry a post part.
    pub generate_post: bool,
    /// Shrink a failing scenario before reporting it.
    pub minimize_failed_scenario: bool,
    /// Re-reproduce the failure under the other mode when that mode
    /// captures interleaving traces.
    pub reproduce_trace_in_other_mode: bool,
    /// Seed for the random scenario generator.
    pub seed: u64,
    /// Scenarios to run before any generated ones.
    pub custom_scenarios: Vec<CustomScenario>,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            testing_time: Duration::from_secs(10),
            mode: RunMode::Stress,
            threads: 2..=3,
            operations_per_thread: 2..=5,
            generate_init: true,
            generate_post: true,
            minimize_failed_scenario: true,
            reproduce_trace_in_other_mode: false,
            seed: 0,
            custom_scenarios: Vec::new(),
        }
    }
}

/// One full testing campaign over a structure under test.
pub struct Campaign<M: SequentialModel, F: StrategyFactory> {
    catalog: OperationCatalog,
    model: M,
    factory: F,
    options: CampaignOptions,
}

impl<M: SequentialModel, F: StrategyFactory> Campaign<M, F> {
    /// Assemble a campaign from its collaborators.
    pub fn new(catalog: OperationCatalog, model: M, factory: F, options: CampaignOptions) -> Self {
        Self {
            catalog,
            model,
            factory,
            options,
        }
    }

    /// Run the campaign to completion or to its first failure.
    ///
    /// Custom scenarios run first under a fixed-invocations planner, then
    /// generated scenarios under the adaptive planner until the budget is
    /// spent. Returns at most one failure; `Err` is reserved for framework
    /// and collaborator bugs.
    pub fn run(&self, tracker: &mut dyn RunTracker) -> Result<Option<TestFailure>, EngineError> {
        let mut verifier = LinearizabilityVerifier::new(self.model.clone());
        let phases = self.phases();
        let initial_mode = phases[0].0;
        let mut iteration_number = 0usize;

        info!(
            custom_scenarios = self.options.custom_scenarios.len(),
            budget_ms = self.options.testing_time.as_millis() as u64,
            "campaign started"
        );

        for custom in &self.options.custom_scenarios {
            custom.scenario.validate()?;
            let invocations = custom
                .invocations
                .unwrap_or(DEFAULT_CUSTOM_SCENARIO_INVOCATIONS);
            let mut planner = FixedInvocationsPlanner::new(invocations);
            if let Some(failure) = self.run_iteration(
                &mut planner,
                initial_mode,
                &custom.scenario,
                &mut verifier,
                tracker,
                iteration_number,
            )? {
                return self
                    .process_failure(failure, initial_mode, &mut verifier)
                    .map(Some);
            }
            iteration_number += 1;
        }

        let mut generator = RandomExecutionGenerator::new(
            self.catalog.clone(),
            GeneratorOptions {
                threads: self.options.threads.clone(),
                operations_per_thread: self.options.operations_per_thread.clone(),
                generate_init: self.options.generate_init,
                generate_post: self.options.generate_post,
                argument_range: 1..=5,
            },
            self.options.seed,
        );

        for (mode, budget) in phases {
            debug!(?mode, budget_ms = budget.as_millis() as u64, "phase started");
            let mut planner = AdaptivePlanner::new(budget, mode);
            let mut iteration = 0;
            while planner.should_do_next_iteration(iteration) {
                let scenario = generator.next_execution()?;
                if let Some(failure) = self.run_iteration(
                    &mut planner,
                    mode,
                    &scenario,
                    &mut verifier,
                    tracker,
                    iteration_number,
                )? {
                    return self.process_failure(failure, mode, &mut verifier).map(Some);
                }
                iteration += 1;
                iteration_number += 1;
            }
        }

        info!("campaign finished without failures");
        Ok(None)
    }

    /// Budget phases in execution order.
    fn phases(&self) -> Vec<(TestingMode, Duration)> {
        match self.options.mode {
            RunMode::Stress => vec![(TestingMode::Stress, self.options.testing_time)],
            RunMode::ModelChecking => {
                vec![(TestingMode::ModelChecking, self.options.testing_time)]
            }
            RunMode::Hybrid => {
                let stress = self
                    .options
                    .testing_time
                    .mul_f64(HYBRID_STRESS_BUDGET_FRACTION);
                vec![
                    (TestingMode::Stress, stress),
                    (TestingMode::ModelChecking, self.options.testing_time - stress),
                ]
            }
        }
    }

    /// Run one scenario for one planner-bounded iteration.
    fn run_iteration(
        &self,
        planner: &mut dyn Planner,
        mode: TestingMode,
        scenario: &ExecutionScenario,
        verifier: &mut LinearizabilityVerifier<M>,
        tracker: &mut dyn RunTracker,
        iteration: usize,
    ) -> Result<Option<TestFailure>, EngineError> {
        let mut strategy = self.factory.create(mode, scenario)?;
        planner.iteration_start();
        tracker.iteration_start(iteration, scenario);

        let mut failure = None;
        let mut invocation = 0;
        while planner.should_do_next_invocation(invocation) {
            tracker.invocation_start(invocation);
            let started = Instant::now();
            let outcome = strategy.run_invocation()?;
            let duration = started.elapsed();
            planner.invocation_end(invocation, duration);
            tracker.invocation_end(invocation, duration);

            match outcome {
                InvocationOutcome::Results(results) => {
                    if !verifier.verify(scenario, &results)? {
                        failure = Some(TestFailure::IncorrectResults {
                            scenario: scenario.clone(),
                            results,
                            trace: strategy.last_trace(),
                        });
                    }
                }
                InvocationOutcome::Failure(strategy_failure) => {
                    failure = Some(strategy_failure);
                }
            }
            if failure.is_some() {
                break;
            }
            invocation += 1;
        }

        planner.iteration_end();
        verifier.on_iteration_end();
        if let Some(statistics) = planner.statistics().iterations().last() {
            tracker.iteration_end(iteration, statistics);
        }
        Ok(failure)
    }

    /// Minimize and trace-enrich a failure before reporting it.
    fn process_failure(
        &self,
        failure: TestFailure,
        mode: TestingMode,
        verifier: &mut LinearizabilityVerifier<M>,
    ) -> Result<TestFailure, EngineError> {
        info!(kind = %failure.kind(), "failure found");

        // Validation failures are independent of sequential consistency:
        // reproduction attempts never go through the verifier for them.
        let verify_results = failure.kind() != FailureKind::Validation;

        let failure = if self.options.minimize_failed_scenario {
            let ctx = MinimizationContext::default();
            minimizer::minimize(failure, &ctx, |candidate, ctx| {
                self.reproduce(
                    candidate,
                    mode,
                    ctx.invocations_per_attempt,
                    verify_results,
                    verifier,
                )
            })?
        } else {
            failure
        };

        if !self.options.reproduce_trace_in_other_mode || failure.trace().is_some() {
            return Ok(failure);
        }
        let other = match mode {
            TestingMode::Stress => TestingMode::ModelChecking,
            TestingMode::ModelChecking => TestingMode::Stress,
        };
        if !self.factory.supports_trace_capture(other) {
            return Ok(failure);
        }
        debug!(?other, "reproducing failure under the other mode for a trace");
        let scenario = failure.scenario().clone();
        let reproduced = self.reproduce(
            &scenario,
            other,
            MinimizationContext::default().invocations_per_attempt,
            verify_results,
            verifier,
        )?;
        match reproduced {
            Some(enriched) if enriched.kind() == failure.kind() && enriched.trace().is_some() => {
                Ok(enriched)
            }
            _ => Ok(failure),
        }
    }

    /// Try to reproduce a failure on `scenario` within `invocations` runs.
    fn reproduce(
        &self,
        scenario: &ExecutionScenario,
        mode: TestingMode,
        invocations: usize,
        verify_results: bool,
        verifier: &mut LinearizabilityVerifier<M>,
    ) -> Result<Option<TestFailure>, EngineError> {
        let mut strategy = self.factory.create(mode, scenario)?;
        for _ in 0..invocations {
            match strategy.run_invocation()? {
                InvocationOutcome::Results(results) => {
                    if verify_results && !verifier.verify(scenario, &results)? {
                        return Ok(Some(TestFailure::IncorrectResults {
                            scenario: scenario.clone(),
                            results,
                            trace: strategy.last_trace(),
                        }));
                    }
                }
                InvocationOutcome::Failure(failure) => return Ok(Some(failure)),
            }
        }
        verifier.on_iteration_end();
        Ok(None)
    }
}
