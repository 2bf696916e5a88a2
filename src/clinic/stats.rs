use super::patient::{Severity, TriagePath};
use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};

/// Per-class patient counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub simple: u64,
    pub moderate: u64,
    pub complex: u64,
}

impl SeverityCounts {
    pub fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Simple => self.simple += 1,
            Severity::Moderate => self.moderate += 1,
            Severity::Complex => self.complex += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.simple + self.moderate + self.complex
    }
}

/// How many patients went down each triage branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriagePathCounts {
    pub nurse: u64,
    pub general_doctor: u64,
    pub nurse_after_wait: u64,
}

/// What a departing patient reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepartureRecord {
    pub severity: Severity,
    pub system_time: SimTime,
    pub total_wait: SimTime,
    pub departed_at: SimTime,
}

/// Accumulators for one run. Never shared between replications.
#[derive(Debug, Clone, Default)]
pub struct StatisticsCollector {
    arrivals: u64,
    turned_away: u64,
    abandoned: u64,
    nurse_waits: Vec<f64>,
    general_waits: Vec<f64>,
    specialist_waits: Vec<f64>,
    total_waits: Vec<f64>,
    system_times: Vec<f64>,
    served: SeverityCounts,
    generated: SeverityCounts,
    triage_paths: TriagePathCounts,
    served_before_cutoff: u64,
    served_after_cutoff: u64,
    occupancy_samples: Vec<(SimTime, usize)>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&mut self, severity: Severity) {
        self.arrivals += 1;
        self.generated.increment(severity);
    }

    pub fn record_turned_away(&mut self) {
        self.turned_away += 1;
    }

    pub fn record_abandoned(&mut self) {
        self.abandoned += 1;
    }

    /// Wait for triage staff. Doctor-performed triage counts here too.
    pub fn record_triage(&mut self, path: TriagePath, wait: SimTime) {
        self.nurse_waits.push(wait);
        match path {
            TriagePath::Nurse => self.triage_paths.nurse += 1,
            TriagePath::GeneralDoctor => self.triage_paths.general_doctor += 1,
            TriagePath::NurseAfterWait => self.triage_paths.nurse_after_wait += 1,
        }
    }

    pub fn record_treatment_wait(&mut self, severity: Severity, wait: SimTime) {
        match severity {
            Severity::Simple => {}
            Severity::Moderate => self.general_waits.push(wait),
            Severity::Complex => self.specialist_waits.push(wait),
        }
    }

    pub fn record_departure(&mut self, record: DepartureRecord, cutoff: SimTime) {
        self.served.increment(record.severity);
        self.system_times.push(record.system_time);
        self.total_waits.push(record.total_wait);
        if record.departed_at < cutoff {
            self.served_before_cutoff += 1;
        } else {
            self.served_after_cutoff += 1;
        }
    }

    pub fn record_occupancy(&mut self, time: SimTime, occupied: usize) {
        self.occupancy_samples.push((time, occupied));
    }

    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    pub fn turned_away(&self) -> u64 {
        self.turned_away
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned
    }

    pub fn served(&self) -> SeverityCounts {
        self.served
    }

    /// Severity mix of every patient that arrived, admitted or not
    pub fn generated(&self) -> SeverityCounts {
        self.generated
    }

    pub fn triage_paths(&self) -> TriagePathCounts {
        self.triage_paths
    }

    pub fn nurse_waits(&self) -> &[f64] {
        &self.nurse_waits
    }

    pub fn general_waits(&self) -> &[f64] {
        &self.general_waits
    }

    pub fn specialist_waits(&self) -> &[f64] {
        &self.specialist_waits
    }

    /// Total waits, index-aligned with [`Self::system_times`]
    pub fn total_waits(&self) -> &[f64] {
        &self.total_waits
    }

    pub fn system_times(&self) -> &[f64] {
        &self.system_times
    }

    pub fn occupancy_samples(&self) -> &[(SimTime, usize)] {
        &self.occupancy_samples
    }

    /// Derive the per-run metrics
    pub fn summarize(&self, cutoff: SimTime, sim_duration: SimTime, truncated: bool) -> RunMetrics {
        let service_rate_before_cutoff = if self.served_before_cutoff > 0 && cutoff > 0.0 {
            self.served_before_cutoff as f64 / cutoff
        } else {
            0.0
        };
        let completed = self.served_before_cutoff + self.served_after_cutoff;

        let before: Vec<f64> = self
            .occupancy_samples
            .iter()
            .filter(|(time, _)| *time < cutoff)
            .map(|(_, occupied)| *occupied as f64)
            .collect();
        let all: Vec<f64> = self
            .occupancy_samples
            .iter()
            .map(|(_, occupied)| *occupied as f64)
            .collect();

        RunMetrics {
            service_rate_before_cutoff,
            service_rate_overall: completed as f64 / sim_duration,
            mean_system_time: mean(&self.system_times),
            mean_wait_nurse: mean(&self.nurse_waits),
            mean_wait_general: mean(&self.general_waits),
            mean_wait_specialist: mean(&self.specialist_waits),
            mean_total_wait: mean(&self.total_waits),
            mean_queue_length_before_cutoff: mean(&before),
            mean_queue_length: mean(&all),
            served: self.served,
            turned_away: self.turned_away,
            arrivals: self.arrivals,
            abandoned: self.abandoned,
            truncated,
        }
    }
}

/// Derived metrics of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Patients per minute completed before the arrival cutoff
    pub service_rate_before_cutoff: f64,
    /// Patients per minute completed over the working day
    pub service_rate_overall: f64,
    pub mean_system_time: f64,
    pub mean_wait_nurse: f64,
    pub mean_wait_general: f64,
    pub mean_wait_specialist: f64,
    pub mean_total_wait: f64,
    pub mean_queue_length_before_cutoff: f64,
    pub mean_queue_length: f64,
    pub served: SeverityCounts,
    pub turned_away: u64,
    pub arrivals: u64,
    pub abandoned: u64,
    /// The run hit the time ceiling with patients still inside
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departure(severity: Severity, system_time: f64, total_wait: f64, at: f64) -> DepartureRecord {
        DepartureRecord {
            severity,
            system_time,
            total_wait,
            departed_at: at,
        }
    }

    #[test]
    fn test_empty_run_summarizes_to_zero() {
        let metrics = StatisticsCollector::new().summarize(420.0, 480.0, false);
        assert_eq!(metrics.service_rate_before_cutoff, 0.0);
        assert_eq!(metrics.service_rate_overall, 0.0);
        assert_eq!(metrics.mean_system_time, 0.0);
        assert_eq!(metrics.mean_queue_length, 0.0);
        assert_eq!(metrics.served.total(), 0);
    }

    #[test]
    fn test_cutoff_split_and_rates() {
        let mut stats = StatisticsCollector::new();
        stats.record_departure(departure(Severity::Simple, 20.0, 5.0, 100.0), 420.0);
        stats.record_departure(departure(Severity::Moderate, 40.0, 10.0, 419.9), 420.0);
        stats.record_departure(departure(Severity::Complex, 60.0, 30.0, 420.0), 420.0);

        let metrics = stats.summarize(420.0, 480.0, false);
        assert_eq!(metrics.service_rate_before_cutoff, 2.0 / 420.0);
        assert_eq!(metrics.service_rate_overall, 3.0 / 480.0);
        assert_eq!(metrics.mean_system_time, 40.0);
        assert_eq!(metrics.mean_total_wait, 15.0);
        assert_eq!(
            metrics.served,
            SeverityCounts {
                simple: 1,
                moderate: 1,
                complex: 1
            }
        );
    }

    #[test]
    fn test_doctor_triage_counts_as_nurse_wait() {
        let mut stats = StatisticsCollector::new();
        stats.record_triage(TriagePath::Nurse, 0.0);
        stats.record_triage(TriagePath::GeneralDoctor, 0.0);
        stats.record_triage(TriagePath::NurseAfterWait, 6.0);

        assert_eq!(stats.nurse_waits(), &[0.0, 0.0, 6.0]);
        assert_eq!(
            stats.triage_paths(),
            TriagePathCounts {
                nurse: 1,
                general_doctor: 1,
                nurse_after_wait: 1
            }
        );
        assert_eq!(stats.summarize(420.0, 480.0, false).mean_wait_nurse, 2.0);
    }

    #[test]
    fn test_treatment_waits_go_to_their_pool() {
        let mut stats = StatisticsCollector::new();
        stats.record_treatment_wait(Severity::Simple, 9.0);
        stats.record_treatment_wait(Severity::Moderate, 4.0);
        stats.record_treatment_wait(Severity::Complex, 8.0);

        assert!(stats.general_waits() == [4.0]);
        assert!(stats.specialist_waits() == [8.0]);
    }

    #[test]
    fn test_queue_length_before_cutoff_uses_earlier_samples_only() {
        let mut stats = StatisticsCollector::new();
        stats.record_occupancy(0.0, 2);
        stats.record_occupancy(1.0, 4);
        stats.record_occupancy(2.0, 9);
        stats.record_occupancy(3.0, 1);

        let metrics = stats.summarize(2.0, 480.0, false);
        assert_eq!(metrics.mean_queue_length_before_cutoff, 3.0);
        assert_eq!(metrics.mean_queue_length, 4.0);
    }
}
