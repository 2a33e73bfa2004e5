//! The sequential reference model ("sequential specification").
//!
//! The verifier replays candidate operation orders against an implementation
//! of [`SequentialModel`] and compares the returned outcomes with the
//! observed ones. The model must be a plain value: cloning it snapshots the
//! state, and `Eq + Hash` give the verifier the state-equivalence relation
//! its memoization is keyed on.

use linearix_core::{Actor, OpResult};

use crate::error::ModelError;

/// A deterministic, single-threaded reference implementation of the
/// structure under test.
///
/// # State equivalence
///
/// `Eq` and `Hash` must relate states that behave identically under all
/// future operations; the derived implementations over the model's fields
/// are almost always right. A model whose equality is vacuous (e.g. one
/// carrying an incomparable handle) should override
/// [`supports_state_equivalence`](Self::supports_state_equivalence) to
/// return `false`: verification stays correct but degenerates to treating
/// every reachable state as distinct, and the verifier warns once.
///
/// # Errors
///
/// `apply` returning `Err` means the *reference* is broken — it failed to
/// execute an operation it claims to model. That propagates as a distinct
/// engine error and is never interpreted as a linearizability verdict.
/// An exception the data structure legitimately produces (e.g. `pop` on an
/// empty stack throwing) is a *result*: return `OpResult::Exception`.
pub trait SequentialModel: Clone + Eq + std::hash::Hash {
    /// Apply one operation to the state, returning its outcome.
    fn apply(&mut self, actor: &Actor) -> Result<OpResult, ModelError>;

    /// Whether `Eq`/`Hash` implement a meaningful state equivalence.
    fn supports_state_equivalence(&self) -> bool {
        true
    }
}
