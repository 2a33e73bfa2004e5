//! Progress reporting hooks.
//!
//! The orchestrator calls a [`RunTracker`] at every iteration and invocation
//! boundary, whether or not a real reporter is attached; the default
//! implementations are no-ops so a tracker only overrides what it needs.

use std::time::Duration;

use tracing::{debug, info};

use linearix_core::ExecutionScenario;

use crate::stats::IterationStatistics;

/// Observer of campaign progress. All hooks default to no-ops.
pub trait RunTracker {
    /// A new iteration is starting on `scenario`.
    fn iteration_start(&mut self, _iteration: usize, _scenario: &ExecutionScenario) {}

    /// The iteration finished with the given statistics.
    fn iteration_end(&mut self, _iteration: usize, _statistics: &IterationStatistics) {}

    /// An invocation is starting.
    fn invocation_start(&mut self, _invocation: usize) {}

    /// The invocation completed in `duration`.
    fn invocation_end(&mut self, _invocation: usize, _duration: Duration) {}
}

/// Tracker that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRunTracker;

impl RunTracker for NoOpRunTracker {}

/// Tracker that logs progress through `tracing`: iterations at info level,
/// invocations at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRunTracker;

impl RunTracker for TracingRunTracker {
    fn iteration_start(&mut self, iteration: usize, scenario: &ExecutionScenario) {
        info!(
            iteration,
            threads = scenario.threads(),
            actors = scenario.actor_count(),
            "iteration started"
        );
    }

    fn iteration_end(&mut self, iteration: usize, statistics: &IterationStatistics) {
        info!(
            iteration,
            invocations = statistics.total_invocations_count(),
            running_time_nano = statistics.total_time_nano() as u64,
            "iteration finished"
        );
    }

    fn invocation_start(&mut self, invocation: usize) {
        debug!(invocation, "invocation started");
    }

    fn invocation_end(&mut self, invocation: usize, duration: Duration) {
        debug!(invocation, duration_nano = duration.as_nanos() as u64, "invocation finished");
    }
}
