//! The failure taxonomy: everything a test run can end with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::ExecutionResult;
use crate::scenario::ExecutionScenario;
use crate::value::ExceptionName;

/// A captured interleaving trace, as produced by a strategy that records
/// scheduling decisions. Opaque to the engine: an ordered list of lines
/// a reporter can print verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterleavingTrace {
    /// Trace lines in scheduling order.
    pub lines: Vec<String>,
}

impl InterleavingTrace {
    /// Create a trace from its lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Whether the trace carries any information.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Discriminant of a [`TestFailure`], used to decide whether a minimization
/// or trace-reproduction attempt reproduced "the same" failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// No sequential witness explains the observed results.
    IncorrectResults,
    /// An invocation did not complete within the strategy's bound.
    Deadlock,
    /// The structure under test raised an undeclared exception.
    UnexpectedException,
    /// A user validation operation's post-condition failed.
    Validation,
    /// A thread was forced to block under a lock-freedom assumption.
    ObstructionFreedom,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::IncorrectResults => "incorrect results",
            FailureKind::Deadlock => "deadlock or timeout",
            FailureKind::UnexpectedException => "unexpected exception",
            FailureKind::Validation => "validation failure",
            FailureKind::ObstructionFreedom => "obstruction-freedom violation",
        };
        write!(f, "{name}")
    }
}

/// The sealed outcome of a failing test run.
///
/// Produced by the strategy (or by the verifier, for `IncorrectResults`),
/// consumed by the minimizer and the reporter. Always carries the scenario
/// it was observed on; results and traces where applicable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestFailure {
    /// The observed results are inconsistent with every valid sequential
    /// witness under the recorded happens-before order.
    IncorrectResults {
        /// Scenario the failure was observed on.
        scenario: ExecutionScenario,
        /// The inconsistent results.
        results: ExecutionResult,
        /// Interleaving trace, when the strategy captured one.
        trace: Option<InterleavingTrace>,
    },
    /// An invocation timed out; the strategy's own bound classified it as a
    /// deadlock. Never produced by the engine itself — there is no
    /// preemptive cancellation of an in-flight invocation.
    Deadlock {
        /// Scenario the failure was observed on.
        scenario: ExecutionScenario,
        /// Interleaving trace, when the strategy captured one.
        trace: Option<InterleavingTrace>,
    },
    /// The structure under test raised an exception not declared as a
    /// legitimate result of the failing actor.
    UnexpectedException {
        /// Scenario the failure was observed on.
        scenario: ExecutionScenario,
        /// Parallel thread the exception escaped from, when known.
        thread: Option<usize>,
        /// Index of the failing actor within its thread, when known.
        actor_index: Option<usize>,
        /// The escaping exception.
        exception: ExceptionName,
        /// Interleaving trace, when the strategy captured one.
        trace: Option<InterleavingTrace>,
    },
    /// A user-declared validation operation failed after an invocation.
    /// Independent of sequential consistency: never re-checked through the
    /// linearizability verifier.
    Validation {
        /// Scenario the failure was observed on.
        scenario: ExecutionScenario,
        /// The validation error message.
        message: String,
    },
    /// A thread was forced to block or retry under a scheduling exploration
    /// that assumed lock-freedom. Reported distinctly from deadlocks; the
    /// blocked actors did not truly hang.
    ObstructionFreedomViolation {
        /// Scenario the failure was observed on.
        scenario: ExecutionScenario,
        /// What forced the thread to block.
        reason: String,
        /// Interleaving trace, when the strategy captured one.
        trace: Option<InterleavingTrace>,
    },
}

impl TestFailure {
    /// The scenario this failure was observed on.
    pub fn scenario(&self) -> &ExecutionScenario {
        match self {
            TestFailure::IncorrectResults { scenario, .. }
            | TestFailure::Deadlock { scenario, .. }
            | TestFailure::UnexpectedException { scenario, .. }
            | TestFailure::Validation { scenario, .. }
            | TestFailure::ObstructionFreedomViolation { scenario, .. } => scenario,
        }
    }

    /// The failure's kind discriminant.
    pub fn kind(&self) -> FailureKind {
        match self {
            TestFailure::IncorrectResults { .. } => FailureKind::IncorrectResults,
            TestFailure::Deadlock { .. } => FailureKind::Deadlock,
            TestFailure::UnexpectedException { .. } => FailureKind::UnexpectedException,
            TestFailure::Validation { .. } => FailureKind::Validation,
            TestFailure::ObstructionFreedomViolation { .. } => FailureKind::ObstructionFreedom,
        }
    }

    /// The captured trace, if any.
    pub fn trace(&self) -> Option<&InterleavingTrace> {
        match self {
            TestFailure::IncorrectResults { trace, .. }
            | TestFailure::Deadlock { trace, .. }
            | TestFailure::UnexpectedException { trace, .. }
            | TestFailure::ObstructionFreedomViolation { trace, .. } => trace.as_ref(),
            TestFailure::Validation { .. } => None,
        }
    }

    /// Attach (or replace) a captured interleaving trace.
    ///
    /// Validation failures carry no trace; the failure is returned unchanged.
    pub fn with_trace(mut self, new_trace: InterleavingTrace) -> Self {
        match &mut self {
            TestFailure::IncorrectResults { trace, .. }
            | TestFailure::Deadlock { trace, .. }
            | TestFailure::UnexpectedException { trace, .. }
            | TestFailure::ObstructionFreedomViolation { trace, .. } => {
                *trace = Some(new_trace);
            }
            TestFailure::Validation { .. } => {}
        }
        self
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "= {} =", self.kind())?;
        write!(f, "{}", self.scenario())?;
        match self {
            TestFailure::IncorrectResults { results, .. } => {
                writeln!(f, "observed results:")?;
                if !results.init.is_empty() {
                    let rendered: Vec<String> =
                        results.init.iter().map(|r| r.to_string()).collect();
                    writeln!(f, "  init: {}", rendered.join(", "))?;
                }
                for (thread, thread_results) in results.parallel.iter().enumerate() {
                    let rendered: Vec<String> = thread_results
                        .iter()
                        .map(|r| format!("{} {}", r.result, r.clock))
                        .collect();
                    writeln!(f, "  [T{thread}] {}", rendered.join(", "))?;
                }
                if !results.post.is_empty() {
                    let rendered: Vec<String> =
                        results.post.iter().map(|r| r.to_string()).collect();
                    writeln!(f, "  post: {}", rendered.join(", "))?;
                }
            }
            TestFailure::UnexpectedException { thread, actor_index, exception, .. } => {
                match (thread, actor_index) {
                    (Some(t), Some(i)) => {
                        writeln!(f, "exception {exception} escaped from [T{t}] actor {i}")?
                    }
                    _ => writeln!(f, "exception {exception} escaped")?,
                }
            }
            TestFailure::Validation { message, .. } => {
                writeln!(f, "validation failed: {message}")?;
            }
            TestFailure::ObstructionFreedomViolation { reason, .. } => {
                // Blocked actors are not rendered as hung: the threads were
                // forced to retry, they did not deadlock.
                writeln!(f, "blocking detected: {reason}")?;
            }
            TestFailure::Deadlock { .. } => {}
        }
        if let Some(trace) = self.trace() {
            if !trace.is_empty() {
                writeln!(f, "interleaving:")?;
                for line in &trace.lines {
                    writeln!(f, "  {line}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, OperationId};
    use crate::value::{OpResult, Value};

    fn scenario() -> ExecutionScenario {
        ExecutionScenario::new(
            vec![],
            vec![vec![Actor::new(OperationId::new(0), vec![Value::Int(1)])]],
            vec![],
        )
    }

    fn incorrect_results() -> TestFailure {
        TestFailure::IncorrectResults {
            scenario: scenario(),
            results: ExecutionResult::new(
                vec![],
                ExecutionResult::unordered_clocks(vec![vec![OpResult::Void]]),
                vec![],
            ),
            trace: None,
        }
    }

    #[test]
    fn test_kind_discriminants() {
        assert_eq!(incorrect_results().kind(), FailureKind::IncorrectResults);
        let deadlock = TestFailure::Deadlock { scenario: scenario(), trace: None };
        assert_eq!(deadlock.kind(), FailureKind::Deadlock);
    }

    #[test]
    fn test_with_trace_attaches() {
        let failure = incorrect_results()
            .with_trace(InterleavingTrace::new(vec!["T0: op#0(1)".into()]));
        assert_eq!(failure.trace().unwrap().lines.len(), 1);
    }

    #[test]
    fn test_validation_failure_never_carries_trace() {
        let failure = TestFailure::Validation {
            scenario: scenario(),
            message: "size mismatch".into(),
        }
        .with_trace(InterleavingTrace::new(vec!["ignored".into()]));
        assert!(failure.trace().is_none());
    }

    #[test]
    fn test_display_mentions_kind_and_scenario() {
        let report = incorrect_results().to_string();
        assert!(report.contains("incorrect results"));
        assert!(report.contains("[T0]"));
    }

    #[test]
    fn test_obstruction_freedom_report_has_no_hung_marker() {
        let failure = TestFailure::ObstructionFreedomViolation {
            scenario: scenario(),
            reason: "lock acquired in lock-free section".into(),
            trace: None,
        };
        let report = failure.to_string();
        assert!(report.contains("blocking detected"));
        assert!(!report.contains("<hung>"));
    }
}
