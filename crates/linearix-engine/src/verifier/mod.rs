//! Linearizability verification.
//!
//! # Overview
//!
//! Given a scenario and the results one invocation actually produced, the
//! verifier decides whether *some* total order of the operations — one that
//! extends both per-thread program order and the recorded happens-before
//! partial order — replays against the sequential reference model with
//! every observed result reproduced exactly.
//!
//! # Search
//!
//! The init part is replayed first in program order (it ran before any
//! concurrency started) and the post part last (it ran after all threads
//! joined); only the parallel part is explored nondeterministically. The
//! search keeps a *frontier*: one cursor per thread into its remaining
//! actors. At each step any thread whose next actor's happens-before
//! predecessors are all applied may move; the move applies the actor to a
//! copy of the model state and survives only if the returned outcome equals
//! the observed one. Reaching the terminal frontier (and matching the post
//! part) proves linearizability; exhausting all enabled moves marks the
//! node dead in the [`lts`] cache and backtracks.
//!
//! The recorded clocks come from a real execution, so they typically
//! collapse the search space far below the n! interleavings of an
//! unconstrained history.

pub mod lts;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::warn;

use linearix_core::{ExecutionResult, ExecutionScenario, ScenarioError};

use crate::error::EngineError;
use crate::model::SequentialModel;
use lts::LtsCache;

/// Checks observed concurrent results against a sequential reference model.
///
/// One verifier instance is bound to one reference model value (the state a
/// fresh data structure starts in) and owns a dead-end cache that persists
/// across iterations until its epoch policy refreshes it. A verifier is
/// exclusively owned by one run; it is not shared across concurrent runs.
pub struct LinearizabilityVerifier<M: SequentialModel> {
    base: M,
    cache: LtsCache<M>,
    degenerate_warned: bool,
}

impl<M: SequentialModel> LinearizabilityVerifier<M> {
    /// Create a verifier whose reference model starts in `base` state.
    pub fn new(base: M) -> Self {
        Self {
            base,
            cache: LtsCache::new(),
            degenerate_warned: false,
        }
    }

    /// Create a verifier with an explicit cache refresh/cap policy.
    pub fn with_cache_policy(base: M, refresh_interval: usize, max_entries: usize) -> Self {
        Self {
            base,
            cache: LtsCache::with_policy(refresh_interval, max_entries),
            degenerate_warned: false,
        }
    }

    /// Decide whether `results` are linearizable for `scenario`.
    ///
    /// Returns `Ok(false)` when no sequential witness exists; `Err` only
    /// when the reference model itself fails or the inputs are malformed.
    pub fn verify(
        &mut self,
        scenario: &ExecutionScenario,
        results: &ExecutionResult,
    ) -> Result<bool, EngineError> {
        if !results.matches_dimensions(scenario) {
            return Err(ScenarioError::DimensionMismatch.into());
        }

        let mut state = self.base.clone();

        // Init ran sequentially before any concurrency: replay in program
        // order and require an exact match. A NoResult here means the
        // invocation never even reached the parallel part; nothing to
        // explain sequentially.
        for (actor, expected) in scenario.init.iter().zip(results.init.iter()) {
            if !expected.ran() {
                return Ok(false);
            }
            let actual = state.apply(actor)?;
            if actual != *expected {
                return Ok(false);
            }
        }

        // A thread's results end at its first NoResult; anything after it
        // must also be NoResult (the thread was cut short, it cannot have
        // produced a later result).
        let mut effective_lens = Vec::with_capacity(results.parallel.len());
        for thread_results in &results.parallel {
            let cut = thread_results
                .iter()
                .position(|r| !r.result.ran())
                .unwrap_or(thread_results.len());
            if thread_results[cut..].iter().any(|r| r.result.ran()) {
                return Ok(false);
            }
            effective_lens.push(cut);
        }

        let memoize = state.supports_state_equivalence();
        if !memoize && !self.degenerate_warned {
            warn!(
                "sequential model opts out of state equivalence; \
                 verification falls back to treating every state as distinct \
                 (correct but slower)"
            );
            self.degenerate_warned = true;
        }

        let fingerprint = fingerprint(scenario, results);
        let mut search = Search {
            scenario,
            results,
            effective_lens: &effective_lens,
            fingerprint,
            cache: &mut self.cache,
            memoize,
        };
        let mut cursors = vec![0usize; scenario.parallel.len()];
        search.explore(&state, &mut cursors)
    }

    /// Iteration boundary: advances the dead-end cache's epoch clock.
    pub fn on_iteration_end(&mut self) {
        self.cache.on_iteration_end();
    }

    /// The verifier's dead-end cache (for policy inspection and tests).
    pub fn cache(&self) -> &LtsCache<M> {
        &self.cache
    }
}

/// Fingerprint of one (scenario, results) pair, namespacing cache entries.
fn fingerprint(scenario: &ExecutionScenario, results: &ExecutionResult) -> u64 {
    let mut hasher = DefaultHasher::new();
    scenario.hash(&mut hasher);
    results.hash(&mut hasher);
    hasher.finish()
}

/// One in-flight verification: borrowed inputs plus the mutable cache.
struct Search<'a, M: SequentialModel> {
    scenario: &'a ExecutionScenario,
    results: &'a ExecutionResult,
    effective_lens: &'a [usize],
    fingerprint: u64,
    cache: &'a mut LtsCache<M>,
    memoize: bool,
}

impl<M: SequentialModel> Search<'_, M> {
    /// Depth-first exploration from the given frontier and model state.
    fn explore(&mut self, state: &M, cursors: &mut Vec<usize>) -> Result<bool, EngineError> {
        if cursors
            .iter()
            .zip(self.effective_lens.iter())
            .all(|(&c, &len)| c == len)
        {
            return self.replay_post(state);
        }

        if self.memoize && self.cache.is_dead(self.fingerprint, cursors, state) {
            return Ok(false);
        }

        for thread in 0..cursors.len() {
            let index = cursors[thread];
            if index >= self.effective_lens[thread] {
                continue;
            }
            let observed = &self.results.parallel[thread][index];
            if !observed.clock.allows(cursors) {
                continue;
            }
            let actor = &self.scenario.parallel[thread][index];
            let mut next_state = state.clone();
            let actual = next_state.apply(actor)?;
            if actual != observed.result {
                continue;
            }
            cursors[thread] += 1;
            let found = self.explore(&next_state, cursors)?;
            cursors[thread] -= 1;
            if found {
                return Ok(true);
            }
        }

        if self.memoize {
            self.cache
                .mark_dead(self.fingerprint, cursors.clone(), state.clone());
        }
        Ok(false)
    }

    /// Post ran sequentially after all threads joined: program order only.
    fn replay_post(&mut self, state: &M) -> Result<bool, EngineError> {
        let mut state = state.clone();
        for (actor, expected) in self.scenario.post.iter().zip(self.results.post.iter()) {
            if !expected.ran() {
                return Ok(false);
            }
            let actual = state.apply(actor)?;
            if actual != *expected {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Replay a scenario single-threaded against a model, producing the exact
/// results (with sequential clocks) a correct structure would yield.
///
/// The round-trip property holds by construction: feeding the returned
/// results back into a verifier over the same model always verifies.
pub fn replay_sequentially<M: SequentialModel>(
    model: &M,
    scenario: &ExecutionScenario,
) -> Result<ExecutionResult, EngineError> {
    let mut state = model.clone();
    let mut init = Vec::with_capacity(scenario.init.len());
    for actor in &scenario.init {
        init.push(state.apply(actor)?);
    }
    let mut parallel = Vec::with_capacity(scenario.parallel.len());
    for thread in &scenario.parallel {
        let mut thread_results = Vec::with_capacity(thread.len());
        for actor in thread {
            thread_results.push(state.apply(actor)?);
        }
        parallel.push(thread_results);
    }
    let mut post = Vec::with_capacity(scenario.post.len());
    for actor in &scenario.post {
        post.push(state.apply(actor)?);
    }
    Ok(ExecutionResult::new(
        init,
        ExecutionResult::sequential_clocks(parallel),
        post,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use linearix_core::{Actor, HBClock, OpResult, OperationId, ResultWithClock, Value};

    use crate::error::ModelError;

    const PUSH: usize = 0;
    const POP: usize = 1;

    /// Sequential stack reference used throughout the verifier tests.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
    struct IntStack {
        items: Vec<i64>,
        /// When set, `Eq`/`Hash` are declared meaningless (degenerate mode).
        opaque: bool,
    }

    impl SequentialModel for IntStack {
        fn apply(&mut self, actor: &Actor) -> Result<OpResult, ModelError> {
            match actor.op.as_usize() {
                PUSH => {
                    let Some(Value::Int(v)) = actor.args.first() else {
                        return Err(ModelError::new("push", "missing integer argument"));
                    };
                    self.items.push(*v);
                    Ok(OpResult::Void)
                }
                POP => Ok(match self.items.pop() {
                    Some(v) => OpResult::Value(Value::Int(v)),
                    None => OpResult::Exception("Empty".into()),
                }),
                other => Err(ModelError::new(format!("op#{other}"), "unknown operation")),
            }
        }

        fn supports_state_equivalence(&self) -> bool {
            !self.opaque
        }
    }

    fn push(v: i64) -> Actor {
        Actor::new(OperationId::new(PUSH), vec![Value::Int(v)])
    }

    fn pop() -> Actor {
        Actor::new(OperationId::new(POP), vec![])
    }

    fn int(v: i64) -> OpResult {
        OpResult::Value(Value::Int(v))
    }

    fn unordered(parallel: Vec<Vec<OpResult>>) -> Vec<Vec<ResultWithClock>> {
        ExecutionResult::unordered_clocks(parallel)
    }

    #[test]
    fn test_two_pushes_two_pops_accepts_witnessed_results() {
        // T0: push(1), pop()   T1: push(1), pop()   no cross-thread edges
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1), pop()], vec![push(1), pop()]],
            vec![],
        );
        let results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void, int(1)],
                vec![OpResult::Void, int(1)],
            ]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_rejects_results_without_witness() {
        // pop()=2 twice, but 2 was never pushed: no witness exists.
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1), pop()], vec![push(1), pop()]],
            vec![],
        );
        let results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void, int(2)],
                vec![OpResult::Void, int(2)],
            ]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(!verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_post_part_order_ambiguity() {
        // parallel=[[push(1)],[push(2)]], post=[pop(),pop()]: either push
        // may have happened first, so both pop orders are linearizable —
        // but pop()=3 is not.
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1)], vec![push(2)]],
            vec![pop(), pop()],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());

        for (first, second, expected) in
            [(2, 1, true), (1, 2, true), (3, 1, false)]
        {
            let results = ExecutionResult::new(
                vec![],
                unordered(vec![vec![OpResult::Void], vec![OpResult::Void]]),
                vec![int(first), int(second)],
            );
            assert_eq!(
                verifier.verify(&scenario, &results).unwrap(),
                expected,
                "post results pop()={first}, pop()={second}"
            );
        }
    }

    #[test]
    fn test_sequential_round_trip_always_verifies() {
        let scenario = ExecutionScenario::new(
            vec![push(10), push(20)],
            vec![
                vec![pop(), push(30)],
                vec![pop(), pop()],
                vec![push(40), pop()],
            ],
            vec![pop(), pop()],
        );
        let model = IntStack::default();
        let results = replay_sequentially(&model, &scenario).unwrap();
        let mut verifier = LinearizabilityVerifier::new(model);
        assert!(verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_happens_before_clock_prunes_witnesses() {
        // T0 pushes 1; T1 pops and sees Empty. Legal only when the pop is
        // not ordered after the push.
        let scenario =
            ExecutionScenario::new(vec![], vec![vec![push(1)], vec![pop()]], vec![]);

        let empty_pop = OpResult::Exception("Empty".into());

        // No cross-thread edge: pop may linearize before push.
        let results = ExecutionResult::new(
            vec![],
            unordered(vec![vec![OpResult::Void], vec![empty_pop.clone()]]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(verifier.verify(&scenario, &results).unwrap());

        // Clock says the push completed before the pop started: Empty is
        // no longer explainable.
        let results = ExecutionResult::new(
            vec![],
            vec![
                vec![ResultWithClock::new(OpResult::Void, HBClock::new(vec![0, 0]))],
                vec![ResultWithClock::new(empty_pop, HBClock::new(vec![1, 0]))],
            ],
            vec![],
        );
        assert!(!verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_init_mismatch_rejected() {
        let scenario =
            ExecutionScenario::new(vec![push(1)], vec![vec![pop()]], vec![]);
        let results = ExecutionResult::new(
            vec![int(99)], // push returns Void, not 99
            unordered(vec![vec![int(1)]]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(!verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_no_result_suffix_treated_as_cut_thread() {
        // T1's second op never ran; the prefix alone must be explainable.
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1)], vec![pop(), pop()]],
            vec![],
        );
        let results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void],
                vec![int(1), OpResult::NoResult],
            ]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_result_after_no_result_rejected() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1)], vec![pop(), pop()]],
            vec![],
        );
        let results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void],
                vec![OpResult::NoResult, int(1)],
            ]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(!verifier.verify(&scenario, &results).unwrap());
    }

    #[test]
    fn test_dimension_mismatch_is_engine_error() {
        let scenario = ExecutionScenario::new(vec![], vec![vec![push(1)]], vec![]);
        let results = ExecutionResult::new(vec![], unordered(vec![vec![]]), vec![]);
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(matches!(
            verifier.verify(&scenario, &results),
            Err(EngineError::InvalidScenario(ScenarioError::DimensionMismatch))
        ));
    }

    #[test]
    fn test_degenerate_equality_bypasses_cache_but_stays_correct() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1), pop()], vec![push(1), pop()]],
            vec![],
        );
        let bad_results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void, int(2)],
                vec![OpResult::Void, int(2)],
            ]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack {
            items: vec![],
            opaque: true,
        });
        assert!(!verifier.verify(&scenario, &bad_results).unwrap());
        assert!(verifier.cache().is_empty());
    }

    #[test]
    fn test_failing_search_populates_dead_end_cache() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1), pop()], vec![push(1), pop()]],
            vec![],
        );
        let bad_results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void, int(2)],
                vec![OpResult::Void, int(2)],
            ]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(!verifier.verify(&scenario, &bad_results).unwrap());
        assert!(!verifier.cache().is_empty());
    }

    #[test]
    fn test_epoch_refresh_clears_cache() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![push(1), pop()], vec![push(1), pop()]],
            vec![],
        );
        let bad_results = ExecutionResult::new(
            vec![],
            unordered(vec![
                vec![OpResult::Void, int(2)],
                vec![OpResult::Void, int(2)],
            ]),
            vec![],
        );
        let mut verifier =
            LinearizabilityVerifier::with_cache_policy(IntStack::default(), 2, 1 << 10);
        verifier.verify(&scenario, &bad_results).unwrap();
        assert!(!verifier.cache().is_empty());
        verifier.on_iteration_end();
        verifier.on_iteration_end();
        assert!(verifier.cache().is_empty());
        assert_eq!(verifier.cache().epoch(), 1);
    }

    #[test]
    fn test_model_error_propagates_distinctly() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![Actor::new(OperationId::new(7), vec![])]],
            vec![],
        );
        let results = ExecutionResult::new(
            vec![],
            unordered(vec![vec![OpResult::Void]]),
            vec![],
        );
        let mut verifier = LinearizabilityVerifier::new(IntStack::default());
        assert!(matches!(
            verifier.verify(&scenario, &results),
            Err(EngineError::SequentialModel(_))
        ));
    }
}
