//! Concurrency-correctness testing engine.
//!
//! `linearix-engine` drives testing campaigns over concurrent data
//! structures: it plans how a wall-clock budget is split across iterations
//! and invocations, generates scenarios, verifies observed results for
//! linearizability against a sequential reference model, and shrinks a
//! failing scenario before reporting it.
//!
//! The execution itself is behind seams: a [`strategy::Strategy`] runs
//! invocations, a [`generator::ExecutionGenerator`] produces scenarios,
//! and a [`tracker::RunTracker`] observes progress. A [`runner::Campaign`]
//! wires them together.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod generator;
pub mod minimizer;
pub mod model;
pub mod planner;
pub mod runner;
pub mod stats;
pub mod strategy;
pub mod tracker;
pub mod verifier;

pub use error::{EngineError, ModelError};
pub use generator::{ExecutionGenerator, GeneratorOptions, RandomExecutionGenerator};
pub use minimizer::{minimize, MinimizationContext, MINIMIZATION_INVOCATIONS};
pub use model::SequentialModel;
pub use planner::{AdaptivePlanner, FixedInvocationsPlanner, Planner, TestingMode};
pub use runner::{
    Campaign, CampaignOptions, CustomScenario, RunMode, DEFAULT_CUSTOM_SCENARIO_INVOCATIONS,
    HYBRID_STRESS_BUDGET_FRACTION,
};
pub use stats::{IterationStatistics, Statistics};
pub use strategy::{
    InvocationOutcome, SequentialStrategy, SequentialStrategyFactory, Strategy, StrategyFactory,
};
pub use tracker::{NoOpRunTracker, RunTracker, TracingRunTracker};
pub use verifier::{replay_sequentially, LinearizabilityVerifier};
