//! Greedy failing-scenario minimization.
//!
//! A random failing scenario is rarely the smallest one: most of its actors
//! are noise around the two or three operations that actually race. The
//! minimizer removes one actor at a time, keeps any removal that still
//! reproduces a failure, and restarts the scan on the smaller scenario.
//!
//! The result is locally minimal, not globally: removals are never explored
//! in combination, so a scenario where only a *pair* of removals reproduces
//! stays unshrunk. That trade keeps the pass linear in the actor count per
//! round, which matters because every attempt re-runs the full strategy.

use tracing::{debug, info};

use linearix_core::{ExecutionScenario, TestFailure};

use crate::error::EngineError;

/// Invocations per minimization attempt.
///
/// Substantially higher than a typical iteration's invocation budget: a
/// removal must not be accepted just because a flaky reproduction missed
/// the interleaving once.
pub const MINIMIZATION_INVOCATIONS: usize = 10_000;

/// Reproduction settings threaded explicitly through every minimization
/// attempt; there is no ambient minimization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimizationContext {
    /// Invocations each reproduction attempt may spend.
    pub invocations_per_attempt: usize,
}

impl Default for MinimizationContext {
    fn default() -> Self {
        Self {
            invocations_per_attempt: MINIMIZATION_INVOCATIONS,
        }
    }
}

/// Candidate scenarios with exactly one actor removed, in removal order:
/// parallel threads last to first (operations within a thread last to
/// first), then init actors last to first, then post actors last to first.
fn removal_candidates(scenario: &ExecutionScenario) -> Vec<ExecutionScenario> {
    let mut candidates = Vec::with_capacity(scenario.actor_count());
    for thread in (0..scenario.parallel.len()).rev() {
        for index in (0..scenario.parallel[thread].len()).rev() {
            candidates.push(scenario.without_parallel_actor(thread, index));
        }
    }
    for index in (0..scenario.init.len()).rev() {
        candidates.push(scenario.without_init_actor(index));
    }
    for index in (0..scenario.post.len()).rev() {
        candidates.push(scenario.without_post_actor(index));
    }
    candidates
}

/// Shrink `failure`'s scenario while `check` still reproduces a failure.
///
/// `check` runs the candidate scenario with the given context and returns
/// the failure it reproduced, if any. Candidates that fail structural
/// validation are skipped without invoking `check`. The first reproducing
/// removal is accepted and the scan restarts from the smaller scenario, so
/// the pass terminates after at most `actor_count` successful rounds.
pub fn minimize<F>(
    failure: TestFailure,
    ctx: &MinimizationContext,
    mut check: F,
) -> Result<TestFailure, EngineError>
where
    F: FnMut(&ExecutionScenario, &MinimizationContext) -> Result<Option<TestFailure>, EngineError>,
{
    let mut current = failure;
    info!(
        actors = current.scenario().actor_count(),
        "minimizing failing scenario"
    );
    'shrink: loop {
        for candidate in removal_candidates(current.scenario()) {
            if candidate.validate().is_err() {
                continue;
            }
            if let Some(reproduced) = check(&candidate, ctx)? {
                debug!(
                    actors = reproduced.scenario().actor_count(),
                    "removal kept the failure, restarting scan"
                );
                current = reproduced;
                continue 'shrink;
            }
        }
        info!(
            actors = current.scenario().actor_count(),
            "minimization finished"
        );
        return Ok(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linearix_core::{Actor, OperationId, Value};

    fn actor(op: usize) -> Actor {
        Actor::new(OperationId::new(op), vec![Value::Int(op as i64)])
    }

    fn failure_on(scenario: ExecutionScenario) -> TestFailure {
        TestFailure::Deadlock { scenario, trace: None }
    }

    /// Oracle: a failure reproduces iff the scenario still contains both
    /// op#1 and op#2 somewhere.
    fn pair_oracle(
        scenario: &ExecutionScenario,
        _ctx: &MinimizationContext,
    ) -> Result<Option<TestFailure>, EngineError> {
        let all: Vec<usize> = scenario
            .init
            .iter()
            .chain(scenario.parallel.iter().flatten())
            .chain(scenario.post.iter())
            .map(|a| a.op.as_usize())
            .collect();
        if all.contains(&1) && all.contains(&2) {
            Ok(Some(failure_on(scenario.clone())))
        } else {
            Ok(None)
        }
    }

    #[test]
    fn test_shrinks_to_local_minimum() {
        let scenario = ExecutionScenario::new(
            vec![actor(0), actor(0)],
            vec![
                vec![actor(1), actor(0), actor(0)],
                vec![actor(0), actor(2)],
            ],
            vec![actor(0)],
        );
        let minimized = minimize(
            failure_on(scenario),
            &MinimizationContext::default(),
            pair_oracle,
        )
        .unwrap();
        let scenario = minimized.scenario();
        // Exactly the two essential actors survive, one per thread.
        assert_eq!(scenario.actor_count(), 2);
        assert!(scenario.init.is_empty());
        assert!(scenario.post.is_empty());
        scenario.validate().unwrap();
    }

    #[test]
    fn test_irreducible_failure_returned_unchanged() {
        let scenario =
            ExecutionScenario::new(vec![], vec![vec![actor(1)], vec![actor(2)]], vec![]);
        let failure = failure_on(scenario.clone());
        let minimized = minimize(
            failure.clone(),
            &MinimizationContext::default(),
            pair_oracle,
        )
        .unwrap();
        assert_eq!(minimized.scenario(), &scenario);
    }

    #[test]
    fn test_callback_never_sees_invalid_scenarios() {
        let scenario =
            ExecutionScenario::new(vec![], vec![vec![actor(1), actor(2)]], vec![]);
        minimize(
            failure_on(scenario),
            &MinimizationContext::default(),
            |candidate, ctx| {
                candidate.validate().expect("invalid candidate reached callback");
                pair_oracle(candidate, ctx)
            },
        )
        .unwrap();
    }

    #[test]
    fn test_check_errors_propagate() {
        let scenario =
            ExecutionScenario::new(vec![], vec![vec![actor(1)], vec![actor(2)]], vec![]);
        let result = minimize(
            failure_on(scenario),
            &MinimizationContext::default(),
            |_, _| Err(EngineError::Strategy("worker died".into())),
        );
        assert!(matches!(result, Err(EngineError::Strategy(_))));
    }

    #[test]
    fn test_attempt_count_is_linear_per_round() {
        // Nothing reproduces: exactly one validity-filtered scan happens.
        let scenario = ExecutionScenario::new(
            vec![actor(0)],
            vec![vec![actor(0), actor(0)], vec![actor(0)]],
            vec![actor(0)],
        );
        let mut attempts = 0;
        minimize(
            failure_on(scenario.clone()),
            &MinimizationContext::default(),
            |_, _| {
                attempts += 1;
                Ok(None)
            },
        )
        .unwrap();
        assert!(attempts <= scenario.actor_count());
    }
}
