use super::config::{ClinicConfig, ReplicationConfig};
use super::simulation_builder::ClinicSimulation;
use super::stats::RunMetrics;
use crate::core::config::ConcurrencyMode;
use crate::core::errors::SimError;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grand means over every replication
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplicationSummary {
    pub replications: usize,
    /// Runs stopped by the time ceiling
    pub truncated_runs: usize,
    pub service_rate_before_cutoff: f64,
    pub service_rate_overall: f64,
    pub mean_system_time: f64,
    pub mean_wait_nurse: f64,
    pub mean_wait_general: f64,
    pub mean_wait_specialist: f64,
    pub mean_total_wait: f64,
    pub mean_queue_length_before_cutoff: f64,
    pub mean_queue_length: f64,
    pub served_simple: f64,
    pub served_moderate: f64,
    pub served_complex: f64,
    pub turned_away: f64,
}

impl ReplicationSummary {
    /// Arithmetic mean of every metric, summed in run order
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        let avg = |f: fn(&RunMetrics) -> f64| runs.iter().map(f).sum::<f64>() / n;

        Self {
            replications: runs.len(),
            truncated_runs: runs.iter().filter(|r| r.truncated).count(),
            service_rate_before_cutoff: avg(|r| r.service_rate_before_cutoff),
            service_rate_overall: avg(|r| r.service_rate_overall),
            mean_system_time: avg(|r| r.mean_system_time),
            mean_wait_nurse: avg(|r| r.mean_wait_nurse),
            mean_wait_general: avg(|r| r.mean_wait_general),
            mean_wait_specialist: avg(|r| r.mean_wait_specialist),
            mean_total_wait: avg(|r| r.mean_total_wait),
            mean_queue_length_before_cutoff: avg(|r| r.mean_queue_length_before_cutoff),
            mean_queue_length: avg(|r| r.mean_queue_length),
            served_simple: avg(|r| r.served.simple as f64),
            served_moderate: avg(|r| r.served.moderate as f64),
            served_complex: avg(|r| r.served.complex as f64),
            turned_away: avg(|r| r.turned_away as f64),
        }
    }
}

impl fmt::Display for ReplicationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Service Rate Before Cutoff: {:.2} patients/minute", self.service_rate_before_cutoff)?;
        writeln!(f, "Service Rate Overall: {:.2} patients/minute", self.service_rate_overall)?;
        writeln!(f, "Average Time in System: {:.2} minutes", self.mean_system_time)?;
        writeln!(f, "Average Wait Time for Nurse: {:.2} minutes", self.mean_wait_nurse)?;
        writeln!(f, "Average Wait Time for General Doctors: {:.2} minutes", self.mean_wait_general)?;
        writeln!(f, "Average Wait Time for Specialist Doctor: {:.2} minutes", self.mean_wait_specialist)?;
        writeln!(f, "Average Total Wait Time for Patients: {:.2} minutes", self.mean_total_wait)?;
        writeln!(f, "Average Queue Length Before Cutoff: {:.2}", self.mean_queue_length_before_cutoff)?;
        writeln!(f, "Overall Average Queue Length: {:.2}", self.mean_queue_length)?;
        writeln!(f, "Patients Served (Simple): {:.2}", self.served_simple)?;
        writeln!(f, "Patients Served (Moderate): {:.2}", self.served_moderate)?;
        writeln!(f, "Patients Served (Complex): {:.2}", self.served_complex)?;
        write!(f, "Total Patients Turned Away: {:.2}", self.turned_away)
    }
}

/// Runs independent seeded simulations and averages them
#[derive(Debug, Clone)]
pub struct ReplicationDriver {
    clinic: ClinicConfig,
    replications: ReplicationConfig,
}

impl ReplicationDriver {
    pub fn new(clinic: ClinicConfig, replications: ReplicationConfig) -> Result<Self, SimError> {
        clinic.validate()?;
        replications.validate()?;
        Ok(Self {
            clinic,
            replications,
        })
    }

    /// One complete run under `seed`
    pub fn run_replication(&self, seed: u64) -> Result<RunMetrics, SimError> {
        ClinicSimulation::from_validated(self.clinic.clone(), seed)?.run_to_completion()
    }

    /// Every run's metrics, in seed order regardless of concurrency mode
    pub fn run_all(&self) -> Result<Vec<RunMetrics>, SimError> {
        let seeds = self.replications.seeds()?;
        let execution = &self.replications.execution;
        info!(
            "Running {} replications ({:?}) from seed {}",
            seeds.len(),
            execution.concurrency_mode,
            self.replications.first_seed
        );

        match execution.concurrency_mode {
            ConcurrencyMode::Sequential => seeds
                .iter()
                .map(|&seed| self.run_replication(seed))
                .collect(),
            ConcurrencyMode::Rayon => {
                let run = || -> Result<Vec<RunMetrics>, SimError> {
                    seeds
                        .par_iter()
                        .map(|&seed| self.run_replication(seed))
                        .collect()
                };
                match execution.thread_pool_size {
                    Some(threads) => rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()
                        .map_err(|e| SimError::config(format!("thread pool: {}", e)))?
                        .install(run),
                    None => run(),
                }
            }
        }
    }

    pub fn run(&self) -> Result<ReplicationSummary, SimError> {
        let runs = self.run_all()?;
        let summary = ReplicationSummary::from_runs(&runs);
        info!(
            "Averaged {} replications ({} truncated)",
            summary.replications, summary.truncated_runs
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic::stats::SeverityCounts;

    fn run(served: u64, wait: f64, truncated: bool) -> RunMetrics {
        RunMetrics {
            service_rate_before_cutoff: 0.1,
            service_rate_overall: 0.2,
            mean_system_time: 30.0,
            mean_wait_nurse: wait,
            mean_wait_general: 0.0,
            mean_wait_specialist: 0.0,
            mean_total_wait: wait,
            mean_queue_length_before_cutoff: 1.0,
            mean_queue_length: 2.0,
            served: SeverityCounts {
                simple: served,
                moderate: 0,
                complex: 0,
            },
            turned_away: 1,
            arrivals: served + 1,
            abandoned: 0,
            truncated,
        }
    }

    #[test]
    fn test_summary_averages_each_field() {
        let summary = ReplicationSummary::from_runs(&[run(10, 2.0, false), run(20, 4.0, true)]);
        assert_eq!(summary.replications, 2);
        assert_eq!(summary.truncated_runs, 1);
        assert_eq!(summary.served_simple, 15.0);
        assert_eq!(summary.mean_wait_nurse, 3.0);
        assert_eq!(summary.turned_away, 1.0);
    }

    #[test]
    fn test_report_has_one_line_per_metric() {
        let summary = ReplicationSummary::from_runs(&[run(10, 2.0, false)]);
        let report = summary.to_string();
        assert_eq!(report.lines().count(), 13);
        assert!(report.contains("Patients Served (Simple): 10.00"));
        assert!(report.contains("Average Wait Time for Nurse: 2.00 minutes"));
    }

    #[test]
    fn test_driver_rejects_bad_configs() {
        assert!(ReplicationDriver::new(ClinicConfig::default(), ReplicationConfig::new(0, 1)).is_err());
        let clinic = ClinicConfig::default().with_staff(0, 1, 1);
        assert!(ReplicationDriver::new(clinic, ReplicationConfig::new(2, 1)).is_err());
    }
}
