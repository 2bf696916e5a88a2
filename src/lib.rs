pub mod clinic;
pub mod core;

// Re-export commonly used types
pub use crate::clinic::{
    ClinicConfig, ClinicSimulation, ReplicationConfig, ReplicationDriver, ReplicationSummary,
    RunMetrics, Severity,
};
pub use crate::core::errors::SimError;
pub use crate::core::simulation_engine::SimulationEngine;
pub use crate::core::types::{PoolId, ProcessId, SimTime};
