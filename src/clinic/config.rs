use crate::core::config::SimulationConfig;
use crate::core::errors::SimError;
use serde::{Deserialize, Serialize};

/// Mean treatment duration for each severity class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentMeans {
    pub simple: f64,
    pub moderate: f64,
    pub complex: f64,
}

impl Default for TreatmentMeans {
    fn default() -> Self {
        Self {
            simple: 15.0,
            moderate: 25.0,
            complex: 35.0,
        }
    }
}

/// How many patients are already waiting when the clinic opens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialBacklog {
    /// Floor of an exponential draw with the given mean
    Exponential { mean: f64 },
    /// Exactly this many patients
    Fixed { count: u64 },
}

impl Default for InitialBacklog {
    fn default() -> Self {
        InitialBacklog::Exponential { mean: 20.0 }
    }
}

/// Parameters of a single clinic run. Times are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub num_nurses: usize,
    pub num_general_doctors: usize,
    pub num_specialist_doctors: usize,
    /// Length of the working day used for the overall service rate
    pub sim_duration: f64,
    /// No new arrivals are generated once the clock reaches this instant
    pub arrival_cutoff: f64,
    pub arrival_mean: f64,
    pub triage_mean: f64,
    pub treatment_means: TreatmentMeans,
    pub waiting_room_capacity: usize,
    pub initial_backlog: InitialBacklog,
    /// Period of the waiting-room occupancy sampler
    pub sample_interval: f64,
    /// Increment used when checking whether the run can stop
    pub termination_step: f64,
    /// Hard ceiling on simulated time
    pub max_time: f64,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            num_nurses: 2,
            num_general_doctors: 2,
            num_specialist_doctors: 1,
            sim_duration: 480.0,
            arrival_cutoff: 420.0,
            arrival_mean: 5.0,
            triage_mean: 5.0,
            treatment_means: TreatmentMeans::default(),
            waiting_room_capacity: 25,
            initial_backlog: InitialBacklog::default(),
            sample_interval: 1.0,
            termination_step: 10.0,
            max_time: 10_000.0,
        }
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

impl ClinicConfig {
    pub fn with_staff(mut self, nurses: usize, general_doctors: usize, specialists: usize) -> Self {
        self.num_nurses = nurses;
        self.num_general_doctors = general_doctors;
        self.num_specialist_doctors = specialists;
        self
    }

    pub fn with_waiting_room(mut self, capacity: usize) -> Self {
        self.waiting_room_capacity = capacity;
        self
    }

    pub fn with_arrival_cutoff(mut self, cutoff: f64) -> Self {
        self.arrival_cutoff = cutoff;
        self
    }

    pub fn with_initial_backlog(mut self, backlog: InitialBacklog) -> Self {
        self.initial_backlog = backlog;
        self
    }

    pub fn with_max_time(mut self, max_time: f64) -> Self {
        self.max_time = max_time;
        self
    }

    /// Reject parameters the model cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        if self.num_nurses == 0 {
            return Err(SimError::config(
                "num_nurses must be at least 1: nurses are the triage fallback",
            ));
        }

        require_positive("sim_duration", self.sim_duration)?;
        require_positive("arrival_mean", self.arrival_mean)?;
        require_positive("triage_mean", self.triage_mean)?;
        require_positive("treatment_means.simple", self.treatment_means.simple)?;
        require_positive("treatment_means.moderate", self.treatment_means.moderate)?;
        require_positive("treatment_means.complex", self.treatment_means.complex)?;
        require_positive("sample_interval", self.sample_interval)?;
        require_positive("termination_step", self.termination_step)?;

        if let InitialBacklog::Exponential { mean } = self.initial_backlog {
            require_positive("initial_backlog.mean", mean)?;
        }

        if !(self.arrival_cutoff.is_finite() && self.arrival_cutoff >= 0.0) {
            return Err(SimError::config(format!(
                "arrival_cutoff must be non-negative and finite, got {}",
                self.arrival_cutoff
            )));
        }
        if !(self.max_time.is_finite() && self.max_time >= self.arrival_cutoff) {
            return Err(SimError::config(format!(
                "max_time ({}) must be finite and not before arrival_cutoff ({})",
                self.max_time, self.arrival_cutoff
            )));
        }
        Ok(())
    }
}

/// How many runs to average and how to execute them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    pub replications: usize,
    /// Replication `i` is seeded with `first_seed + i`
    pub first_seed: u64,
    pub execution: SimulationConfig,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replications: 1000,
            first_seed: 1,
            execution: SimulationConfig::default(),
        }
    }
}

impl ReplicationConfig {
    pub fn new(replications: usize, first_seed: u64) -> Self {
        Self {
            replications,
            first_seed,
            execution: SimulationConfig::default(),
        }
    }

    pub fn with_execution(mut self, execution: SimulationConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.replications == 0 {
            return Err(SimError::config("replications must be at least 1"));
        }
        if self.execution.thread_pool_size == Some(0) {
            return Err(SimError::config("thread_pool_size must be at least 1"));
        }
        self.seeds().map(|_| ())
    }

    /// The seed of every replication, in order
    pub fn seeds(&self) -> Result<Vec<u64>, SimError> {
        (0..self.replications as u64)
            .map(|i| {
                self.first_seed.checked_add(i).ok_or_else(|| {
                    SimError::config(format!(
                        "seed sequence starting at {} overflows after {} replications",
                        self.first_seed, i
                    ))
                })
            })
            .collect()
    }
}

/// Both configuration sections, as read from a JSON file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub clinic: ClinicConfig,
    pub replications: ReplicationConfig,
}

impl ExperimentConfig {
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        serde_json::from_str(text).map_err(|e| SimError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ClinicConfig::default().validate().is_ok());
        assert!(ReplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_missing_nurses() {
        let config = ClinicConfig::default().with_staff(0, 2, 1);
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_allows_empty_doctor_pools_and_waiting_room() {
        let config = ClinicConfig::default()
            .with_staff(1, 0, 0)
            .with_waiting_room(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_means() {
        let mut config = ClinicConfig::default();
        config.triage_mean = 0.0;
        assert!(config.validate().is_err());

        let mut config = ClinicConfig::default();
        config.treatment_means.complex = -3.0;
        assert!(config.validate().is_err());

        let config =
            ClinicConfig::default().with_initial_backlog(InitialBacklog::Exponential { mean: 0.0 });
        assert!(config.validate().is_err());

        let mut config = ClinicConfig::default();
        config.arrival_mean = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_ceiling_before_cutoff() {
        let config = ClinicConfig::default().with_max_time(100.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_sequence() {
        let config = ReplicationConfig::new(3, 7);
        assert_eq!(config.seeds().unwrap(), vec![7, 8, 9]);

        let config = ReplicationConfig::new(2, u64::MAX);
        assert!(config.validate().is_err());

        assert!(ReplicationConfig::new(0, 1).validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ExperimentConfig::from_json(
            r#"{
                "clinic": { "num_nurses": 3, "initial_backlog": { "fixed": { "count": 4 } } },
                "replications": { "replications": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.clinic.num_nurses, 3);
        assert_eq!(config.clinic.num_general_doctors, 2);
        assert_eq!(config.clinic.initial_backlog, InitialBacklog::Fixed { count: 4 });
        assert_eq!(config.replications.replications, 10);
        assert_eq!(config.replications.first_seed, 1);
    }

    #[test]
    fn test_bad_json_is_a_config_error() {
        assert!(matches!(
            ExperimentConfig::from_json("{ not json"),
            Err(SimError::Config(_))
        ));
    }
}
