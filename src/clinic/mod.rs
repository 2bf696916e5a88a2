//! Walk-in clinic model: patients arrive, are triaged by a nurse (or a free
//! general doctor), then treated according to severity.

pub mod arrivals;
pub mod config;
pub mod gate;
pub mod model;
pub mod monitor;
pub mod patient;
pub mod replication;
pub mod simulation_builder;
pub mod stats;

pub use config::{ClinicConfig, ExperimentConfig, InitialBacklog, ReplicationConfig, TreatmentMeans};
pub use gate::{Admission, AdmissionGate};
pub use model::{Clinic, StaffPools};
pub use patient::{PatientProcess, Severity, TriagePath};
pub use replication::{ReplicationDriver, ReplicationSummary};
pub use simulation_builder::ClinicSimulation;
pub use stats::{RunMetrics, SeverityCounts, StatisticsCollector};
