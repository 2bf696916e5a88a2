use super::types::PoolId;
use thiserror::Error;

/// Errors that can stop a simulation from starting or from continuing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Rejected parameters; the simulation must not run
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Internal consistency failure in the scheduler or a resource pool
    #[error("Scheduler invariant violated: {0}")]
    SchedulerInvariantViolation(String),
    /// A process referenced a pool that was never added to the context
    #[error("Unknown resource pool: {0}")]
    UnknownPool(PoolId),
    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl SimError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        SimError::SchedulerInvariantViolation(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }
}
