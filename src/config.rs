//! Search configuration.

use std::time::Duration;

use crate::constants::{DEFAULT_THINK_MS, EXPLORATION};

/// Runtime parameters of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Wall-clock budget per decision. Polled between iterations, so a
    /// search may overrun it by one rollout batch.
    pub think_time: Duration,

    /// Exploration constant `C` in the UCB score.
    pub exploration: f64,

    /// Rollout worker threads. 0 uses rayon's global pool.
    pub threads: usize,

    /// Seed for the rollout generators. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            think_time: Duration::from_millis(DEFAULT_THINK_MS),
            exploration: EXPLORATION,
            threads: 0,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// A short budget and a fixed seed, for tests.
    pub fn for_testing() -> Self {
        Self::default()
            .with_think_time(Duration::from_millis(5))
            .with_seed(0x7E4)
    }
}
