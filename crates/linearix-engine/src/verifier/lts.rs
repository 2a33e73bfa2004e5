//! Memoized dead-end cache over the verifier's transition system.
//!
//! The verifier's search graph is a labeled transition system whose nodes
//! are (frontier, sequential-model state) pairs. Nodes proven to lead only
//! to dead ends are cached so sibling branches — and later invocations of
//! the same or a structurally similar scenario — skip them.
//!
//! Retaining the cache across iterations is a performance/memory trade-off,
//! not a correctness requirement, so the policy is explicit: the cache is an
//! arena with an epoch counter, and a fresh arena is allocated every
//! [`LTS_REFRESH_INTERVAL`] iterations (plus a hard entry cap), bounding
//! memory growth deterministically.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::trace;

/// Iterations between arena refreshes.
pub const LTS_REFRESH_INTERVAL: usize = 100;

/// Hard cap on cached dead ends within one epoch; insertion stops beyond it.
pub const MAX_CACHE_ENTRIES: usize = 1 << 20;

/// A node proven dead: no enabled move from this frontier and state leads
/// to a terminal frontier with matching results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DeadEndKey<M> {
    /// Fingerprint of the (scenario, results) pair the node belongs to,
    /// so reuse across iterations never conflates different scenarios.
    fingerprint: u64,
    /// One cursor per parallel thread into its remaining actors.
    frontier: Vec<usize>,
    /// Sequential-model state at the node.
    state: M,
}

/// Epoch-scoped arena of known-dead LTS nodes.
#[derive(Debug)]
pub struct LtsCache<M> {
    dead_ends: HashSet<DeadEndKey<M>>,
    epoch: u64,
    iterations_in_epoch: usize,
    refresh_interval: usize,
    max_entries: usize,
}

impl<M: Clone + Eq + Hash> LtsCache<M> {
    /// Cache with the default refresh interval and entry cap.
    pub fn new() -> Self {
        Self::with_policy(LTS_REFRESH_INTERVAL, MAX_CACHE_ENTRIES)
    }

    /// Cache with an explicit refresh/cap policy.
    pub fn with_policy(refresh_interval: usize, max_entries: usize) -> Self {
        Self {
            dead_ends: HashSet::new(),
            epoch: 0,
            iterations_in_epoch: 0,
            refresh_interval: refresh_interval.max(1),
            max_entries,
        }
    }

    /// Record a dead end, unless the arena is at capacity.
    pub fn mark_dead(&mut self, fingerprint: u64, frontier: Vec<usize>, state: M) {
        if self.dead_ends.len() >= self.max_entries {
            return;
        }
        self.dead_ends.insert(DeadEndKey { fingerprint, frontier, state });
    }

    /// Whether this node is already known to be a dead end.
    pub fn is_dead(&self, fingerprint: u64, frontier: &[usize], state: &M) -> bool {
        // Probe with a borrowed key equivalent; HashSet has no heterogeneous
        // lookup for struct keys, so build a cheap probe key instead.
        let probe = DeadEndKey {
            fingerprint,
            frontier: frontier.to_vec(),
            state: state.clone(),
        };
        self.dead_ends.contains(&probe)
    }

    /// Iteration boundary: advance the epoch clock and refresh when due.
    pub fn on_iteration_end(&mut self) {
        self.iterations_in_epoch += 1;
        if self.iterations_in_epoch >= self.refresh_interval {
            self.advance_epoch();
        }
    }

    /// Drop the arena and start a new epoch immediately.
    pub fn advance_epoch(&mut self) {
        trace!(
            epoch = self.epoch,
            discarded = self.dead_ends.len(),
            "refreshing LTS dead-end arena"
        );
        self.dead_ends = HashSet::new();
        self.epoch += 1;
        self.iterations_in_epoch = 0;
    }

    /// Current epoch number.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Cached dead ends in the current epoch.
    pub fn len(&self) -> usize {
        self.dead_ends.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.dead_ends.is_empty()
    }
}

impl<M: Clone + Eq + Hash> Default for LtsCache<M> {
    fn default() -> Self {
        Self::new()
    }
}
