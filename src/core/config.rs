//! How a batch of independent simulations is executed.

use serde::{Deserialize, Serialize};

/// How independent replications are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// One after another on the calling thread
    #[default]
    Sequential,
    /// Spread across a rayon thread pool
    Rayon,
}

/// Execution settings for a batch of replications. A single run is always
/// single-threaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub concurrency_mode: ConcurrencyMode,
    /// Worker count for `Rayon`; `None` uses the global pool
    pub thread_pool_size: Option<usize>,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Only read in `Rayon` mode
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }
}
