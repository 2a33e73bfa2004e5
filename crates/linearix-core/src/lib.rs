//! linearix-core: the execution data model of the linearix testing engine.
//!
//! # Overview
//!
//! This crate defines the plain values the engine crates exchange:
//!
//! - [`Value`] / [`OpResult`] — operation arguments and observed outcomes
//! - [`Actor`] / [`OperationCatalog`] — operation identities and invocations
//! - [`ExecutionScenario`] — the init / parallel / post test-case triple
//! - [`ExecutionResult`] / [`HBClock`] — observed outcomes plus the
//!   happens-before partial order recorded during a concurrent run
//! - [`TestFailure`] — the sealed taxonomy of failing run outcomes
//!
//! Everything here is an immutable value with structural equality and serde
//! support; no execution machinery lives in this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actor;
pub mod failure;
pub mod result;
pub mod scenario;
pub mod value;

pub use actor::{Actor, OperationCatalog, OperationDescriptor, OperationId};
pub use failure::{FailureKind, InterleavingTrace, TestFailure};
pub use result::{ExecutionResult, HBClock, ResultWithClock};
pub use scenario::{ExecutionScenario, ScenarioError};
pub use value::{ExceptionName, OpResult, Value};
