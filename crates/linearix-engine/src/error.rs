//! Engine-level errors.
//!
//! Two channels never mix in this crate: bugs in the structure under test
//! travel as [`TestFailure`](linearix_core::TestFailure) *values*, while
//! anything on [`EngineError`]'s `Err` channel is a framework-level problem
//! — a collaborator contract violation or an internal invariant breach —
//! that must abort the run without being minimized or scored as a
//! data-structure bug.

use thiserror::Error;

use linearix_core::ScenarioError;

/// Error raised by the sequential reference model during replay.
///
/// Distinct from a linearizability verdict: a model that fails to apply an
/// operation signals a broken reference implementation, not a bug in the
/// structure under test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sequential model failed applying {operation}: {message}")]
pub struct ModelError {
    /// Rendered actor the model choked on.
    pub operation: String,
    /// Model-supplied explanation.
    pub message: String,
}

impl ModelError {
    /// Create a model error.
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Fatal, non-test failures of the engine or its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A scenario handed to the engine violates structural invariants.
    #[error("invalid scenario: {0}")]
    InvalidScenario(#[from] ScenarioError),

    /// The sequential reference model failed during replay.
    #[error(transparent)]
    SequentialModel(#[from] ModelError),

    /// The execution generator could not produce a scenario.
    #[error("execution generator failed: {0}")]
    Generator(String),

    /// The execution strategy failed outside the test subject's fault —
    /// e.g. it could not set up worker threads.
    #[error("execution strategy failed: {0}")]
    Strategy(String),

    /// An engine invariant was violated. Always a bug in linearix itself;
    /// please report it with the scenario that triggered it.
    #[error("internal engine invariant violated (please report this): {0}")]
    Internal(String),
}
