use super::config::{ClinicConfig, InitialBacklog};
use super::gate::AdmissionGate;
use super::patient::Severity;
use super::stats::StatisticsCollector;
use crate::core::errors::SimError;
use crate::core::types::{PoolId, SimTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Cumulative thresholds of the severity mix (0.6 / 0.3 / 0.1)
const SIMPLE_THRESHOLD: f64 = 0.6;
const MODERATE_THRESHOLD: f64 = 0.9;

/// Handles of the three staff pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffPools {
    pub nurses: PoolId,
    pub general_doctors: PoolId,
    pub specialists: PoolId,
}

fn exponential(name: &str, mean: f64) -> Result<Exp<f64>, SimError> {
    Exp::new(1.0 / mean)
        .map_err(|e| SimError::config(format!("{} (mean {}): {}", name, mean, e)))
}

struct Distributions {
    arrival: Exp<f64>,
    triage: Exp<f64>,
    simple: Exp<f64>,
    moderate: Exp<f64>,
    complex: Exp<f64>,
    backlog: Option<Exp<f64>>,
}

impl Distributions {
    fn from_config(config: &ClinicConfig) -> Result<Self, SimError> {
        let backlog = match config.initial_backlog {
            InitialBacklog::Exponential { mean } => Some(exponential("initial backlog", mean)?),
            InitialBacklog::Fixed { .. } => None,
        };
        Ok(Self {
            arrival: exponential("inter-arrival time", config.arrival_mean)?,
            triage: exponential("triage time", config.triage_mean)?,
            simple: exponential("simple treatment", config.treatment_means.simple)?,
            moderate: exponential("moderate treatment", config.treatment_means.moderate)?,
            complex: exponential("complex treatment", config.treatment_means.complex)?,
            backlog,
        })
    }
}

/// Everything one clinic run mutates besides the kernel: the waiting room,
/// the statistics and the random stream.
pub struct Clinic {
    config: ClinicConfig,
    pools: StaffPools,
    pub gate: AdmissionGate,
    pub stats: StatisticsCollector,
    rng: StdRng,
    distributions: Distributions,
    next_patient: u64,
}

impl Clinic {
    /// Expects a configuration that has already passed `ClinicConfig::validate`.
    /// Only the distribution parameters are checked again here.
    pub fn new(config: ClinicConfig, pools: StaffPools, seed: u64) -> Result<Self, SimError> {
        let distributions = Distributions::from_config(&config)?;
        Ok(Self {
            gate: AdmissionGate::new(config.waiting_room_capacity),
            stats: StatisticsCollector::new(),
            rng: StdRng::seed_from_u64(seed),
            distributions,
            pools,
            config,
            next_patient: 0,
        })
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn pools(&self) -> StaffPools {
        self.pools
    }

    /// Pool that treats the given class, if it needs one
    pub fn treatment_pool(&self, severity: Severity) -> Option<PoolId> {
        match severity {
            Severity::Simple => None,
            Severity::Moderate => Some(self.pools.general_doctors),
            Severity::Complex => Some(self.pools.specialists),
        }
    }

    pub fn next_patient_id(&mut self) -> u64 {
        let id = self.next_patient;
        self.next_patient += 1;
        id
    }

    pub fn draw_severity(&mut self) -> Severity {
        let roll: f64 = self.rng.gen();
        if roll < SIMPLE_THRESHOLD {
            Severity::Simple
        } else if roll < MODERATE_THRESHOLD {
            Severity::Moderate
        } else {
            Severity::Complex
        }
    }

    pub fn sample_interarrival(&mut self) -> SimTime {
        self.distributions.arrival.sample(&mut self.rng)
    }

    pub fn sample_triage(&mut self) -> SimTime {
        self.distributions.triage.sample(&mut self.rng)
    }

    pub fn sample_treatment(&mut self, severity: Severity) -> SimTime {
        let distribution = match severity {
            Severity::Simple => &self.distributions.simple,
            Severity::Moderate => &self.distributions.moderate,
            Severity::Complex => &self.distributions.complex,
        };
        distribution.sample(&mut self.rng)
    }

    /// Size of the queue already waiting at opening time
    pub fn sample_initial_backlog(&mut self) -> u64 {
        match (self.config.initial_backlog, &self.distributions.backlog) {
            (InitialBacklog::Fixed { count }, _) => count,
            (InitialBacklog::Exponential { .. }, Some(distribution)) => {
                distribution.sample(&mut self.rng).floor().max(0.0) as u64
            }
            (InitialBacklog::Exponential { .. }, None) => 0,
        }
    }
}
