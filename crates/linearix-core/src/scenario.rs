//! Execution scenarios: the init / parallel / post operation-list triple.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::Actor;

/// Why a scenario (or a minimization candidate) is structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    /// The parallel part has no threads.
    #[error("scenario has an empty parallel part")]
    EmptyParallelPart,
    /// A parallel thread has no actors.
    #[error("parallel thread {thread} has no actors")]
    EmptyParallelThread {
        /// Index of the offending thread.
        thread: usize,
    },
    /// A suspendable actor appears in the init part.
    #[error("suspendable actor at init position {index}")]
    SuspendableInInitPart {
        /// Index of the offending actor within the init part.
        index: usize,
    },
    /// Suspendable actors appear in more than one parallel thread.
    #[error("suspendable actors in more than one parallel thread ({first} and {second})")]
    SuspendableInMultipleThreads {
        /// First thread containing a suspendable actor.
        first: usize,
        /// Second thread containing a suspendable actor.
        second: usize,
    },
    /// A scenario with suspendable parallel actors has a post part.
    #[error("scenario with suspendable actors has a non-empty post part")]
    SuspendableWithPostPart,
    /// A result structure does not match the scenario's shape.
    #[error("execution result dimensions do not match the scenario")]
    DimensionMismatch,
}

/// One test case: a sequential prefix, a set of concurrently executed
/// per-thread operation sequences, and a sequential suffix.
///
/// Produced by a generator or a user's scenario builder; consumed read-only
/// by strategies and the verifier. The minimizer produces copies with one
/// actor removed via the `without_*` constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionScenario {
    /// Operations executed sequentially before concurrency starts.
    pub init: Vec<Actor>,
    /// Per-thread operation sequences executed concurrently.
    pub parallel: Vec<Vec<Actor>>,
    /// Operations executed sequentially after all parallel threads complete.
    pub post: Vec<Actor>,
}

impl ExecutionScenario {
    /// Create a scenario from its three parts.
    pub fn new(init: Vec<Actor>, parallel: Vec<Vec<Actor>>, post: Vec<Actor>) -> Self {
        Self { init, parallel, post }
    }

    /// Number of parallel threads.
    pub fn threads(&self) -> usize {
        self.parallel.len()
    }

    /// Total number of actors across all three parts.
    pub fn actor_count(&self) -> usize {
        self.init.len()
            + self.parallel.iter().map(Vec::len).sum::<usize>()
            + self.post.len()
    }

    /// Whether any actor anywhere in the scenario is suspendable.
    pub fn has_suspendable_actors(&self) -> bool {
        self.init.iter().chain(self.post.iter()).any(|a| a.suspendable)
            || self.parallel.iter().flatten().any(|a| a.suspendable)
    }

    /// Check the structural invariants.
    ///
    /// A valid scenario has a non-empty parallel part with every thread
    /// non-empty. If suspendable actors are present: none in the init part,
    /// all confined to a single parallel thread, and the post part empty.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.parallel.is_empty() {
            return Err(ScenarioError::EmptyParallelPart);
        }
        for (thread, actors) in self.parallel.iter().enumerate() {
            if actors.is_empty() {
                return Err(ScenarioError::EmptyParallelThread { thread });
            }
        }
        if self.has_suspendable_actors() {
            if let Some(index) = self.init.iter().position(|a| a.suspendable) {
                return Err(ScenarioError::SuspendableInInitPart { index });
            }
            let mut suspendable_thread: Option<usize> = None;
            for (thread, actors) in self.parallel.iter().enumerate() {
                if actors.iter().any(|a| a.suspendable) {
                    match suspendable_thread {
                        None => suspendable_thread = Some(thread),
                        Some(first) => {
                            return Err(ScenarioError::SuspendableInMultipleThreads {
                                first,
                                second: thread,
                            });
                        }
                    }
                }
            }
            if suspendable_thread.is_some() && !self.post.is_empty() {
                return Err(ScenarioError::SuspendableWithPostPart);
            }
        }
        Ok(())
    }

    /// Copy of this scenario with one parallel actor removed.
    ///
    /// Removing the last actor of a thread removes the now-empty thread
    /// entirely. The copy is *not* validated; minimization candidates are
    /// validated (and skipped when invalid) by the caller.
    pub fn without_parallel_actor(&self, thread: usize, index: usize) -> Self {
        let mut copy = self.clone();
        copy.parallel[thread].remove(index);
        if copy.parallel[thread].is_empty() {
            copy.parallel.remove(thread);
        }
        copy
    }

    /// Copy of this scenario with one init actor removed.
    pub fn without_init_actor(&self, index: usize) -> Self {
        let mut copy = self.clone();
        copy.init.remove(index);
        copy
    }

    /// Copy of this scenario with one post actor removed.
    pub fn without_post_actor(&self, index: usize) -> Self {
        let mut copy = self.clone();
        copy.post.remove(index);
        copy
    }
}

impl fmt::Display for ExecutionScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.init.is_empty() {
            writeln!(f, "init:")?;
            for actor in &self.init {
                writeln!(f, "  {actor}")?;
            }
        }
        writeln!(f, "parallel:")?;
        for (thread, actors) in self.parallel.iter().enumerate() {
            write!(f, "  [T{thread}]")?;
            for actor in actors {
                write!(f, " {actor}")?;
            }
            writeln!(f)?;
        }
        if !self.post.is_empty() {
            writeln!(f, "post:")?;
            for actor in &self.post {
                writeln!(f, "  {actor}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::OperationId;
    use crate::value::Value;

    fn actor(op: usize, arg: i64) -> Actor {
        Actor::new(OperationId::new(op), vec![Value::Int(arg)])
    }

    fn suspendable_actor(op: usize) -> Actor {
        let mut a = Actor::new(OperationId::new(op), vec![]);
        a.suspendable = true;
        a
    }

    #[test]
    fn test_valid_scenario() {
        let scenario = ExecutionScenario::new(
            vec![actor(0, 1)],
            vec![vec![actor(0, 2)], vec![actor(1, 0)]],
            vec![actor(1, 0)],
        );
        assert!(scenario.validate().is_ok());
        assert_eq!(scenario.threads(), 2);
        assert_eq!(scenario.actor_count(), 4);
    }

    #[test]
    fn test_empty_parallel_part_rejected() {
        let scenario = ExecutionScenario::new(vec![actor(0, 1)], vec![], vec![]);
        assert_eq!(scenario.validate(), Err(ScenarioError::EmptyParallelPart));
    }

    #[test]
    fn test_empty_parallel_thread_rejected() {
        let scenario = ExecutionScenario::new(vec![], vec![vec![actor(0, 1)], vec![]], vec![]);
        assert_eq!(
            scenario.validate(),
            Err(ScenarioError::EmptyParallelThread { thread: 1 })
        );
    }

    #[test]
    fn test_suspendable_in_init_rejected() {
        let scenario = ExecutionScenario::new(
            vec![suspendable_actor(0)],
            vec![vec![actor(1, 1)]],
            vec![],
        );
        assert_eq!(
            scenario.validate(),
            Err(ScenarioError::SuspendableInInitPart { index: 0 })
        );
    }

    #[test]
    fn test_suspendable_in_two_threads_rejected() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![suspendable_actor(0)], vec![suspendable_actor(0)]],
            vec![],
        );
        assert_eq!(
            scenario.validate(),
            Err(ScenarioError::SuspendableInMultipleThreads { first: 0, second: 1 })
        );
    }

    #[test]
    fn test_suspendable_with_post_rejected() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![suspendable_actor(0)], vec![actor(1, 1)]],
            vec![actor(1, 2)],
        );
        assert_eq!(scenario.validate(), Err(ScenarioError::SuspendableWithPostPart));
    }

    #[test]
    fn test_without_parallel_actor_drops_empty_thread() {
        let scenario = ExecutionScenario::new(
            vec![],
            vec![vec![actor(0, 1)], vec![actor(0, 2), actor(1, 0)]],
            vec![],
        );
        let smaller = scenario.without_parallel_actor(0, 0);
        assert_eq!(smaller.threads(), 1);
        assert_eq!(smaller.parallel[0].len(), 2);

        let smaller = scenario.without_parallel_actor(1, 1);
        assert_eq!(smaller.threads(), 2);
        assert_eq!(smaller.parallel[1].len(), 1);
    }

    #[test]
    fn test_without_init_and_post_actor() {
        let scenario = ExecutionScenario::new(
            vec![actor(0, 1), actor(0, 2)],
            vec![vec![actor(1, 0)]],
            vec![actor(1, 0)],
        );
        assert_eq!(scenario.without_init_actor(1).init, vec![actor(0, 1)]);
        assert!(scenario.without_post_actor(0).post.is_empty());
    }
}
