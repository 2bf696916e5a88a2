pub mod config;
pub mod errors;
pub mod event;
pub mod event_scheduler;
pub mod process;
pub mod resource_pool;
pub mod simulation_engine;
pub mod types;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SimulationConfig};
pub use errors::SimError;
pub use event_scheduler::EventScheduler;
pub use process::{Process, SimContext, Yield};
pub use resource_pool::{Acquisition, ResourcePool};
pub use simulation_engine::{SimulationEngine, SimulationObserver};
pub use types::{PoolId, ProcessId, SimTime};
