use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::duration::IntoBudget;
use crate::error::ConfigError;

/// Draws random delays in `[0, budget)` from a generator it owns.
///
/// With a seed, the sequence of delays is fully reproducible. Not
/// synchronized; an `Executor` keeps its planner behind a lock.
#[derive(Debug)]
pub struct DelayPlanner {
    budget: Duration,
    rng: StdRng,
}

impl DelayPlanner {
    /// Fails with `ConfigError` for a negative or malformed budget.
    pub fn new(budget: impl IntoBudget, seed: Option<u64>) -> Result<Self, ConfigError> {
        let budget = budget.into_budget()?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { budget, rng })
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Next delay against the configured budget.
    pub fn sample(&mut self) -> Duration {
        self.sample_within(self.budget)
    }

    /// Next delay against an explicit budget. Zero budget yields zero and
    /// does not advance the generator.
    pub fn sample_within(&mut self, budget: Duration) -> Duration {
        let nanos = u64::try_from(budget.as_nanos()).unwrap_or(u64::MAX);
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.rng.gen_range(0..nanos))
    }
}
