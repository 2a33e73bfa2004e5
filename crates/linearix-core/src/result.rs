//! Execution results and happens-before clocks.
//!
//! An [`ExecutionResult`] mirrors the shape of its scenario: one
//! [`OpResult`] per init/post actor, and one [`ResultWithClock`] per
//! parallel actor. The clock is the partial-order input to the verifier:
//! it records, per thread, how many of that thread's parallel operations
//! were known to have completed before this operation started. Any
//! sequential witness the verifier proposes must respect those edges.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scenario::ExecutionScenario;
use crate::value::OpResult;

/// Happens-before clock recorded at the start of one parallel operation.
///
/// `clock[t]` is the number of thread `t`'s parallel operations that had
/// completed before this operation began. The entry for the operation's own
/// thread equals its index within that thread (program order).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HBClock {
    /// Completed-operation counts, indexed by parallel thread.
    pub clock: Vec<usize>,
}

impl HBClock {
    /// Clock with all entries zero (no known predecessors).
    pub fn empty(threads: usize) -> Self {
        Self { clock: vec![0; threads] }
    }

    /// Clock from explicit per-thread counts.
    pub fn new(clock: Vec<usize>) -> Self {
        Self { clock }
    }

    /// Whether all happens-before predecessors are already applied.
    ///
    /// `applied[t]` is the number of thread `t`'s operations the verifier
    /// has already placed in its candidate sequential order.
    pub fn allows(&self, applied: &[usize]) -> bool {
        self.clock
            .iter()
            .zip(applied.iter())
            .all(|(&required, &done)| done >= required)
    }

    /// Number of thread entries.
    pub fn threads(&self) -> usize {
        self.clock.len()
    }
}

impl fmt::Display for HBClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.clock.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}

/// Result of one parallel operation together with its happens-before clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultWithClock {
    /// The observed outcome.
    pub result: OpResult,
    /// Clock snapshot taken when the operation started.
    pub clock: HBClock,
}

impl ResultWithClock {
    /// Pair a result with its clock.
    pub fn new(result: OpResult, clock: HBClock) -> Self {
        Self { result, clock }
    }
}

/// All observed outcomes of one invocation of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcomes of the init part, in program order.
    pub init: Vec<OpResult>,
    /// Outcomes of the parallel part, per thread, in program order.
    pub parallel: Vec<Vec<ResultWithClock>>,
    /// Outcomes of the post part, in program order.
    pub post: Vec<OpResult>,
}

impl ExecutionResult {
    /// Create a result triple.
    pub fn new(
        init: Vec<OpResult>,
        parallel: Vec<Vec<ResultWithClock>>,
        post: Vec<OpResult>,
    ) -> Self {
        Self { init, parallel, post }
    }

    /// Whether this result has the same shape as `scenario`.
    pub fn matches_dimensions(&self, scenario: &ExecutionScenario) -> bool {
        self.init.len() == scenario.init.len()
            && self.post.len() == scenario.post.len()
            && self.parallel.len() == scenario.parallel.len()
            && self
                .parallel
                .iter()
                .zip(scenario.parallel.iter())
                .all(|(results, actors)| results.len() == actors.len())
    }

    /// Build parallel results with *sequential* clocks: thread 0 ran to
    /// completion, then thread 1, and so on.
    ///
    /// Used by strategies that replay scenarios without real concurrency
    /// (for example the sequential round-trip strategy); the resulting
    /// partial order admits exactly one linearization.
    pub fn sequential_clocks(parallel: Vec<Vec<OpResult>>) -> Vec<Vec<ResultWithClock>> {
        let threads = parallel.len();
        let lens: Vec<usize> = parallel.iter().map(Vec::len).collect();
        parallel
            .into_iter()
            .enumerate()
            .map(|(t, results)| {
                results
                    .into_iter()
                    .enumerate()
                    .map(|(i, result)| {
                        let mut clock = vec![0; threads];
                        for (u, entry) in clock.iter_mut().enumerate() {
                            *entry = match u.cmp(&t) {
                                std::cmp::Ordering::Less => lens[u],
                                std::cmp::Ordering::Equal => i,
                                std::cmp::Ordering::Greater => 0,
                            };
                        }
                        ResultWithClock::new(result, HBClock::new(clock))
                    })
                    .collect()
            })
            .collect()
    }

    /// Build parallel results with *empty* clocks (no happens-before edges
    /// across threads, only program order constrains the search).
    pub fn unordered_clocks(parallel: Vec<Vec<OpResult>>) -> Vec<Vec<ResultWithClock>> {
        let threads = parallel.len();
        parallel
            .into_iter()
            .enumerate()
            .map(|(t, results)| {
                results
                    .into_iter()
                    .enumerate()
                    .map(|(i, result)| {
                        let mut clock = HBClock::empty(threads);
                        clock.clock[t] = i;
                        ResultWithClock::new(result, clock)
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_clock_allows() {
        let clock = HBClock::new(vec![1, 0]);
        assert!(clock.allows(&[1, 0]));
        assert!(clock.allows(&[2, 3]));
        assert!(!clock.allows(&[0, 5]));
    }

    #[test]
    fn test_empty_clock_allows_anything() {
        let clock = HBClock::empty(3);
        assert!(clock.allows(&[0, 0, 0]));
    }

    #[test]
    fn test_sequential_clocks_shape() {
        let parallel = vec![
            vec![OpResult::Void, OpResult::Void],
            vec![OpResult::Value(Value::Int(1))],
        ];
        let with_clocks = ExecutionResult::sequential_clocks(parallel);
        // Thread 0, op 1: one own op before it, nothing from thread 1.
        assert_eq!(with_clocks[0][1].clock.clock, vec![1, 0]);
        // Thread 1, op 0: all of thread 0 completed first.
        assert_eq!(with_clocks[1][0].clock.clock, vec![2, 0]);
    }

    #[test]
    fn test_unordered_clocks_keep_program_order() {
        let parallel = vec![vec![OpResult::Void, OpResult::Void], vec![OpResult::Void]];
        let with_clocks = ExecutionResult::unordered_clocks(parallel);
        assert_eq!(with_clocks[0][0].clock.clock, vec![0, 0]);
        assert_eq!(with_clocks[0][1].clock.clock, vec![1, 0]);
        assert_eq!(with_clocks[1][0].clock.clock, vec![0, 0]);
    }

    #[test]
    fn test_matches_dimensions() {
        use crate::actor::{Actor, OperationId};
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![Actor::new(OperationId::new(0), vec![])]],
            vec![],
        );
        let ok = ExecutionResult::new(
            vec![],
            ExecutionResult::unordered_clocks(vec![vec![OpResult::Void]]),
            vec![],
        );
        assert!(ok.matches_dimensions(&scenario));

        let wrong = ExecutionResult::new(vec![OpResult::Void], ok.parallel.clone(), vec![]);
        assert!(!wrong.matches_dimensions(&scenario));
    }
}
