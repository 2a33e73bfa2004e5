//! Scenario generation.
//!
//! Campaigns consume scenarios from an [`ExecutionGenerator`]; the provided
//! [`RandomExecutionGenerator`] samples them from an operation catalog with
//! a seeded RNG, so any run is reproducible from its seed alone.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use linearix_core::{Actor, ExecutionScenario, OperationCatalog, OperationId, Value};

use crate::error::EngineError;

/// Source of scenarios for the campaign's iteration loop.
pub trait ExecutionGenerator {
    /// Produce the next scenario. Every returned scenario must pass
    /// [`ExecutionScenario::validate`].
    fn next_execution(&mut self) -> Result<ExecutionScenario, EngineError>;
}

/// Shape parameters for random scenario generation.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Parallel thread count range (inclusive).
    pub threads: RangeInclusive<usize>,
    /// Operations per parallel thread (inclusive).
    pub operations_per_thread: RangeInclusive<usize>,
    /// Whether to generate a sequential init part.
    pub generate_init: bool,
    /// Whether to generate a sequential post part.
    pub generate_post: bool,
    /// Integer arguments are drawn from this range (inclusive).
    pub argument_range: RangeInclusive<i64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            threads: 2..=3,
            operations_per_thread: 2..=5,
            generate_init: true,
            generate_post: true,
            argument_range: 1..=5,
        }
    }
}

/// Seeded random scenario generator over an operation catalog.
///
/// Suspendable operations constrain scenario shape, so the generator places
/// them only in one designated parallel thread, never in the init part, and
/// drops the post part whenever one was actually placed.
pub struct RandomExecutionGenerator {
    catalog: OperationCatalog,
    options: GeneratorOptions,
    rng: StdRng,
    non_suspendable: Vec<OperationId>,
}

impl RandomExecutionGenerator {
    /// Create a generator over `catalog` seeded with `seed`.
    pub fn new(catalog: OperationCatalog, options: GeneratorOptions, seed: u64) -> Self {
        let non_suspendable = catalog
            .operations()
            .iter()
            .enumerate()
            .filter(|(_, op)| !op.suspendable)
            .map(|(i, _)| OperationId::new(i))
            .collect();
        Self {
            catalog,
            options,
            rng: StdRng::seed_from_u64(seed),
            non_suspendable,
        }
    }

    fn random_actor(&mut self, allow_suspendable: bool) -> Result<Actor, EngineError> {
        let id = if allow_suspendable || !self.catalog.has_suspendable_operations() {
            OperationId::new(self.rng.gen_range(0..self.catalog.len()))
        } else {
            if self.non_suspendable.is_empty() {
                return Err(EngineError::Generator(
                    "catalog has only suspendable operations; cannot fill a \
                     non-suspendable position"
                        .into(),
                ));
            }
            self.non_suspendable[self.rng.gen_range(0..self.non_suspendable.len())]
        };
        let arity = self
            .catalog
            .get(id)
            .map(|d| d.arity)
            .unwrap_or_default();
        let args = (0..arity)
            .map(|_| Value::Int(self.rng.gen_range(self.options.argument_range.clone())))
            .collect();
        Ok(self.catalog.actor(id, args))
    }

    fn random_part(
        &mut self,
        length: usize,
        allow_suspendable: bool,
    ) -> Result<Vec<Actor>, EngineError> {
        (0..length)
            .map(|_| self.random_actor(allow_suspendable))
            .collect()
    }
}

impl ExecutionGenerator for RandomExecutionGenerator {
    fn next_execution(&mut self) -> Result<ExecutionScenario, EngineError> {
        if self.catalog.is_empty() {
            return Err(EngineError::Generator("operation catalog is empty".into()));
        }

        let threads = self.rng.gen_range(self.options.threads.clone()).max(1);
        // Only one thread may carry suspendable actors.
        let suspendable_thread = self.rng.gen_range(0..threads);

        let mut parallel = Vec::with_capacity(threads);
        for thread in 0..threads {
            let length = self
                .rng
                .gen_range(self.options.operations_per_thread.clone())
                .max(1);
            parallel.push(self.random_part(length, thread == suspendable_thread)?);
        }
        let placed_suspendable = parallel
            .iter()
            .flatten()
            .any(|actor| actor.suspendable);

        let init = if self.options.generate_init {
            let length = self
                .rng
                .gen_range(self.options.operations_per_thread.clone());
            self.random_part(length, false)?
        } else {
            Vec::new()
        };
        let post = if self.options.generate_post && !placed_suspendable {
            let length = self
                .rng
                .gen_range(self.options.operations_per_thread.clone());
            self.random_part(length, false)?
        } else {
            Vec::new()
        };

        let scenario = ExecutionScenario::new(init, parallel, post);
        scenario
            .validate()
            .map_err(|e| EngineError::Generator(format!("generated invalid scenario: {e}")))?;
        Ok(scenario)
    }
}
