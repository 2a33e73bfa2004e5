//! Deadline-aware planning of iterations and invocations.
//!
//! # Overview
//!
//! A testing campaign has a fixed wall-clock budget but no idea up front
//! what one invocation costs: that depends on the structure under test, the
//! thread count, and the execution mode. The [`AdaptivePlanner`] solves this
//! by re-estimating after every iteration: given the observed average
//! invocation cost and the remaining budget, it resizes both the number of
//! remaining iterations and the per-iteration invocation budget so the run
//! lands on the deadline while holding a target invocations-to-iterations
//! ratio.
//!
//! # Algorithm
//!
//! With `remaining = budget - elapsed` and `avg` the observed average
//! invocation time, the planner can still afford
//! `remaining_invocations = remaining / avg` invocations. Holding the target
//! ratio `invocations = RATIO * iterations` and spending everything,
//!
//! ```text
//! total_invocations = iterations * invocations_per_iteration
//!                   = invocations_per_iteration^2 / RATIO
//! =>  invocations_per_iteration = sqrt(total_invocations * RATIO)
//! ```
//!
//! The bound is rounded to a granularity multiple and clamped per mode:
//! model-checking invocations are far more expensive than stress ones, so
//! their ceiling sits much lower.
//!
//! # Overrun policy
//!
//! There is no preemption: an in-flight invocation always runs to
//! completion. The planner instead enforces a *bounded* overrun — a hard
//! stop once elapsed time exceeds `budget + admissible_delay` — and cuts an
//! iteration short once it overruns its planned slice by a fixed error
//! factor, so one pathological scenario cannot eat the whole remaining
//! budget.

use std::time::Duration;

use tracing::debug;

use crate::stats::Statistics;

/// Execution mode of the strategy an iteration runs under.
///
/// Only the invocation-cost profile matters to the planner, so this enum
/// lives here; the orchestrator maps its user-facing run mode onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestingMode {
    /// High-throughput stress execution; invocations are cheap.
    Stress,
    /// Managed model-checking execution; invocations are expensive.
    ModelChecking,
}

impl TestingMode {
    /// Inclusive `[lower, upper]` clamp for the per-iteration invocation
    /// bound in this mode.
    pub const fn invocation_bounds(self) -> (usize, usize) {
        match self {
            TestingMode::Stress => (STRESS_INVOCATIONS_LOWER_BOUND, STRESS_INVOCATIONS_UPPER_BOUND),
            TestingMode::ModelChecking => (
                MODEL_CHECKING_INVOCATIONS_LOWER_BOUND,
                MODEL_CHECKING_INVOCATIONS_UPPER_BOUND,
            ),
        }
    }
}

/// Target ratio of invocations-per-iteration to iterations.
pub const INVOCATIONS_TO_ITERATIONS_RATIO: u128 = 100;

/// Warm-up invocations per iteration, excluded from cost estimation.
///
/// The first invocations of a fresh scenario pay one-time costs (lazy
/// initialization, code warm-up) that would otherwise bias the average.
pub const WARM_UP_INVOCATIONS_COUNT: usize = 5;

/// The invocation bound is rounded to a multiple of this granularity.
pub const INVOCATIONS_GRANULARITY: usize = 50;

/// Invocation bound clamp in stress mode.
pub const STRESS_INVOCATIONS_LOWER_BOUND: usize = 100;
/// Upper invocation bound in stress mode.
pub const STRESS_INVOCATIONS_UPPER_BOUND: usize = 20_000;
/// Lower invocation bound in model-checking mode.
pub const MODEL_CHECKING_INVOCATIONS_LOWER_BOUND: usize = 10;
/// Upper invocation bound in model-checking mode.
pub const MODEL_CHECKING_INVOCATIONS_UPPER_BOUND: usize = 5_000;

/// Full iterations treated as warm-up before bound re-estimation kicks in.
pub const ADAPTIVE_WARM_UP_ITERATIONS: usize = 1;

/// An iteration is cut short once its running time exceeds its planned
/// slice by this factor.
pub const ITERATION_TIME_ERROR_FACTOR: u128 = 2;

/// Floor of the admissible overrun past the deadline.
pub const MIN_ADMISSIBLE_DELAY: Duration = Duration::from_millis(500);

/// Admissible overrun as a fraction of the budget: `budget / this`.
pub const ADMISSIBLE_DELAY_BUDGET_DIVISOR: u32 = 10;

/// A trailing extra iteration is scheduled only when at least
/// `planned_iteration_time / this` of budget remains.
pub const EXTRA_ITERATION_MIN_TIME_DIVISOR: u128 = 4;

/// Iterations bound used before the first adjustment.
const INITIAL_ITERATIONS_BOUND: usize = 30;

/// Invocations bound used before the first adjustment (clamped per mode).
const INITIAL_INVOCATIONS_BOUND: usize = 1_000;

/// Decides, boundary by boundary, whether the campaign keeps going.
///
/// One planner instance drives one run; it owns the run's [`Statistics`]
/// and is never shared across concurrently running campaigns.
pub trait Planner {
    /// Called before each iteration. `iteration` is the 0-based count of
    /// iterations already completed.
    fn should_do_next_iteration(&mut self, iteration: usize) -> bool;

    /// Called before each invocation within an iteration. `invocation` is
    /// the 0-based count of invocations already completed this iteration.
    fn should_do_next_invocation(&mut self, invocation: usize) -> bool;

    /// Whether the given invocation index is a warm-up invocation.
    fn is_warm_up_invocation(&self, invocation: usize) -> bool;

    /// Open a new iteration in the statistics tracker.
    fn iteration_start(&mut self);

    /// Finalize the current iteration.
    fn iteration_end(&mut self);

    /// Record one completed invocation's duration.
    fn invocation_end(&mut self, invocation: usize, duration: Duration);

    /// Read-only view of the run's statistics.
    fn statistics(&self) -> &Statistics;
}

/// Self-tuning planner that allocates a wall-clock budget across an unknown
/// number of iterations of unknown-cost invocations.
#[derive(Debug)]
pub struct AdaptivePlanner {
    statistics: Statistics,
    mode: TestingMode,
    testing_time_nano: u128,
    admissible_delay_nano: u128,
    iterations_bound: usize,
    invocations_bound: usize,
    current_iteration_planned_time_nano: u128,
}

impl AdaptivePlanner {
    /// Create a planner for the given budget and mode.
    pub fn new(testing_time: Duration, mode: TestingMode) -> Self {
        let testing_time_nano = testing_time.as_nanos();
        let admissible_delay_nano = (testing_time / ADMISSIBLE_DELAY_BUDGET_DIVISOR)
            .max(MIN_ADMISSIBLE_DELAY)
            .as_nanos();
        let (lower, upper) = mode.invocation_bounds();
        Self {
            statistics: Statistics::new(),
            mode,
            testing_time_nano,
            admissible_delay_nano,
            iterations_bound: INITIAL_ITERATIONS_BOUND,
            invocations_bound: INITIAL_INVOCATIONS_BOUND.clamp(lower, upper),
            current_iteration_planned_time_nano: 0,
        }
    }

    /// The execution mode this planner budgets for.
    pub fn mode(&self) -> TestingMode {
        self.mode
    }

    /// Current per-iteration invocation bound (excluding warm-up).
    pub fn invocations_bound(&self) -> usize {
        self.invocations_bound
    }

    /// Current total-iterations bound.
    pub fn iterations_bound(&self) -> usize {
        self.iterations_bound
    }

    /// Budget remaining, by recorded running time. Zero once exhausted.
    pub fn remaining_time_nano(&self) -> u128 {
        self.testing_time_nano
            .saturating_sub(self.statistics.running_time_nano())
    }

    /// Re-estimate both bounds from observed cost and remaining budget.
    ///
    /// Skips recomputation entirely (keeping prior bounds) when no time
    /// remains or nothing has been measured yet — never divides by a
    /// non-positive remaining time.
    fn adjust_bounds(&mut self) {
        let average = self.statistics.average_invocation_time_nano();
        if average == 0 {
            return;
        }
        let remaining = self.remaining_time_nano();
        if remaining == 0 {
            return;
        }

        let performed_invocations = self.statistics.measured_invocations_count() as u128;
        let remaining_invocations = remaining / average;
        let total_invocations = performed_invocations + remaining_invocations;

        // invocations_per_iteration = sqrt(total * ratio), see module docs.
        let raw = ((total_invocations * INVOCATIONS_TO_ITERATIONS_RATIO) as f64).sqrt();
        let granules = (raw / INVOCATIONS_GRANULARITY as f64).round().max(1.0) as usize;
        let (lower, upper) = self.mode.invocation_bounds();
        self.invocations_bound = (granules * INVOCATIONS_GRANULARITY).clamp(lower, upper);

        let performed_iterations = self.statistics.iterations_count();
        let remaining_iterations = (remaining_invocations as usize) / self.invocations_bound;
        self.iterations_bound = performed_iterations + remaining_iterations;
        self.current_iteration_planned_time_nano =
            (self.invocations_bound + WARM_UP_INVOCATIONS_COUNT) as u128 * average;

        // Zero iterations left but meaningful time remaining: schedule one
        // more rather than leaving budget unused, gated so we never start an
        // iteration that cannot complete even a fraction of its plan.
        if self.iterations_bound <= performed_iterations
            && remaining >= self.current_iteration_planned_time_nano / EXTRA_ITERATION_MIN_TIME_DIVISOR
        {
            self.iterations_bound = performed_iterations + 1;
        }

        debug!(
            invocations_bound = self.invocations_bound,
            iterations_bound = self.iterations_bound,
            average_invocation_nano = average as u64,
            remaining_nano = remaining as u64,
            "adjusted planner bounds"
        );
    }
}

impl Planner for AdaptivePlanner {
    fn should_do_next_iteration(&mut self, iteration: usize) -> bool {
        if iteration >= ADAPTIVE_WARM_UP_ITERATIONS {
            self.adjust_bounds();
        }
        iteration < self.iterations_bound && self.remaining_time_nano() > 0
    }

    fn should_do_next_invocation(&mut self, invocation: usize) -> bool {
        // Hard stop: bounded overrun past the deadline, even mid-warm-up.
        let running = self.statistics.running_time_nano();
        if running > self.testing_time_nano + self.admissible_delay_nano {
            return false;
        }
        if invocation < WARM_UP_INVOCATIONS_COUNT {
            return true;
        }
        if invocation >= self.invocations_bound + WARM_UP_INVOCATIONS_COUNT {
            return false;
        }
        // Early cut-off: this iteration already blew through its planned
        // slice by more than the error factor.
        if self.current_iteration_planned_time_nano > 0 {
            if let Some(current) = self.statistics.current_iteration() {
                if current.total_time_nano()
                    > self.current_iteration_planned_time_nano * ITERATION_TIME_ERROR_FACTOR
                {
                    return false;
                }
            }
        }
        true
    }

    fn is_warm_up_invocation(&self, invocation: usize) -> bool {
        invocation < WARM_UP_INVOCATIONS_COUNT
    }

    fn iteration_start(&mut self) {
        self.statistics.iteration_start();
    }

    fn iteration_end(&mut self) {
        self.statistics.iteration_end();
    }

    fn invocation_end(&mut self, invocation: usize, duration: Duration) {
        self.statistics
            .invocation_end(duration.as_nanos(), self.is_warm_up_invocation(invocation));
    }

    fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}

/// Planner for user-pinned scenarios: exactly one iteration of exactly
/// `invocations` invocations, no warm-up accounting, no deadline.
#[derive(Debug)]
pub struct FixedInvocationsPlanner {
    statistics: Statistics,
    invocations: usize,
}

impl FixedInvocationsPlanner {
    /// Create a planner that runs `invocations` invocations once.
    pub fn new(invocations: usize) -> Self {
        Self {
            statistics: Statistics::new(),
            invocations,
        }
    }
}

impl Planner for FixedInvocationsPlanner {
    fn should_do_next_iteration(&mut self, iteration: usize) -> bool {
        iteration == 0
    }

    fn should_do_next_invocation(&mut self, invocation: usize) -> bool {
        invocation < self.invocations
    }

    fn is_warm_up_invocation(&self, _invocation: usize) -> bool {
        false
    }

    fn iteration_start(&mut self) {
        self.statistics.iteration_start();
    }

    fn iteration_end(&mut self) {
        self.statistics.iteration_end();
    }

    fn invocation_end(&mut self, invocation: usize, duration: Duration) {
        self.statistics
            .invocation_end(duration.as_nanos(), self.is_warm_up_invocation(invocation));
    }

    fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}
