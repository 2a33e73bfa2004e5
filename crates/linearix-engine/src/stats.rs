//! Per-iteration and per-invocation bookkeeping.
//!
//! The statistics tracker is the sole mutable state the planner reads. It is
//! written only by the thread driving the iteration loop — exactly once per
//! invocation boundary and once per iteration boundary, never retroactively
//! — and may be read-shared afterward for reporting.

/// Counters for one iteration (one scenario tested for many invocations).
///
/// Warm-up invocations are tracked separately so the planner's average-cost
/// estimate is not skewed by one-time initialization costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationStatistics {
    /// Measured (non-warm-up) invocations completed in this iteration.
    invocations_count: usize,
    /// Total measured running time, nanoseconds.
    running_time_nano: u128,
    /// Warm-up invocations completed in this iteration.
    warm_up_invocations_count: usize,
    /// Total warm-up running time, nanoseconds.
    warm_up_time_nano: u128,
}

impl IterationStatistics {
    /// Measured (non-warm-up) invocations in this iteration.
    pub fn invocations_count(&self) -> usize {
        self.invocations_count
    }

    /// Measured running time in nanoseconds, excluding warm-up.
    pub fn running_time_nano(&self) -> u128 {
        self.running_time_nano
    }

    /// Warm-up invocations in this iteration.
    pub fn warm_up_invocations_count(&self) -> usize {
        self.warm_up_invocations_count
    }

    /// Warm-up running time in nanoseconds.
    pub fn warm_up_time_nano(&self) -> u128 {
        self.warm_up_time_nano
    }

    /// All invocations in this iteration, warm-up included.
    pub fn total_invocations_count(&self) -> usize {
        self.invocations_count + self.warm_up_invocations_count
    }

    /// All running time in this iteration, warm-up included.
    pub fn total_time_nano(&self) -> u128 {
        self.running_time_nano + self.warm_up_time_nano
    }
}

/// Run-wide statistics: one [`IterationStatistics`] per iteration, retained
/// for the whole run to drive adaptive re-estimation.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    iterations: Vec<IterationStatistics>,
    in_iteration: bool,
}

impl Statistics {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new iteration. Must alternate with [`Self::iteration_end`].
    pub fn iteration_start(&mut self) {
        debug_assert!(!self.in_iteration, "iteration_start called twice");
        self.iterations.push(IterationStatistics::default());
        self.in_iteration = true;
    }

    /// Finalize the current iteration.
    pub fn iteration_end(&mut self) {
        debug_assert!(self.in_iteration, "iteration_end without iteration_start");
        self.in_iteration = false;
    }

    /// Record one completed invocation. Called exactly once per invocation
    /// boundary, after the invocation's duration is fully known.
    pub fn invocation_end(&mut self, duration_nano: u128, warm_up: bool) {
        debug_assert!(self.in_iteration, "invocation_end outside an iteration");
        let Some(current) = self.iterations.last_mut() else {
            return;
        };
        if warm_up {
            current.warm_up_invocations_count += 1;
            current.warm_up_time_nano += duration_nano;
        } else {
            current.invocations_count += 1;
            current.running_time_nano += duration_nano;
        }
    }

    /// Finalized and in-flight iterations, indexed by iteration number.
    pub fn iterations(&self) -> &[IterationStatistics] {
        &self.iterations
    }

    /// Iterations started so far.
    pub fn iterations_count(&self) -> usize {
        self.iterations.len()
    }

    /// Exact total running time in nanoseconds, warm-up included.
    ///
    /// This is the planner's notion of elapsed testing time: the sum of all
    /// recorded invocation durations, with no drift.
    pub fn running_time_nano(&self) -> u128 {
        self.iterations.iter().map(|it| it.total_time_nano()).sum()
    }

    /// Total invocations across the run, warm-up included.
    pub fn total_invocations_count(&self) -> usize {
        self.iterations
            .iter()
            .map(|it| it.total_invocations_count())
            .sum()
    }

    /// Measured invocations across the run, excluding warm-up.
    pub fn measured_invocations_count(&self) -> usize {
        self.iterations.iter().map(|it| it.invocations_count()).sum()
    }

    /// Average cost of one invocation in nanoseconds, excluding warm-up.
    ///
    /// Falls back to the warm-up average when no measured invocation has
    /// completed yet; returns 0 when nothing has run at all.
    pub fn average_invocation_time_nano(&self) -> u128 {
        let measured: u128 = self
            .iterations
            .iter()
            .map(|it| it.running_time_nano())
            .sum();
        let count = self.measured_invocations_count() as u128;
        if count > 0 {
            return measured / count;
        }
        let warm_up: u128 = self.iterations.iter().map(|it| it.warm_up_time_nano()).sum();
        let warm_up_count = self
            .iterations
            .iter()
            .map(|it| it.warm_up_invocations_count())
            .sum::<usize>() as u128;
        if warm_up_count > 0 {
            warm_up / warm_up_count
        } else {
            0
        }
    }

    /// Statistics of the iteration currently in flight, if any.
    pub fn current_iteration(&self) -> Option<&IterationStatistics> {
        if self.in_iteration {
            self.iterations.last()
        } else {
            None
        }
    }
}
