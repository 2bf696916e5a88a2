use super::arrivals::ArrivalGenerator;
use super::config::ClinicConfig;
use super::model::{Clinic, StaffPools};
use super::monitor::OccupancyMonitor;
use super::patient::{PatientProcess, Severity};
use super::stats::RunMetrics;
use crate::core::errors::SimError;
use crate::core::process::SimContext;
use crate::core::simulation_engine::{SimulationEngine, SimulationObserver};
use crate::core::types::ProcessId;
use log::{debug, info, warn};

/// One seeded clinic run: the engine, the three staff pools, the arrival
/// generator and the occupancy monitor.
pub struct ClinicSimulation {
    engine: SimulationEngine<Clinic>,
    seed: u64,
}

impl ClinicSimulation {
    pub fn new(config: ClinicConfig, seed: u64) -> Result<Self, SimError> {
        config.validate()?;
        Self::from_validated(config, seed)
    }

    /// Build a run from a configuration that has already passed `validate`
    pub(crate) fn from_validated(config: ClinicConfig, seed: u64) -> Result<Self, SimError> {
        let interval = config.sample_interval;

        let mut ctx = SimContext::new();
        let pools = StaffPools {
            nurses: ctx.add_pool("nurses", config.num_nurses),
            general_doctors: ctx.add_pool("general doctors", config.num_general_doctors),
            specialists: ctx.add_pool("specialist doctors", config.num_specialist_doctors),
        };
        let clinic = Clinic::new(config, pools, seed)?;

        let mut engine = SimulationEngine::with_context(ctx, clinic);
        engine.spawn(Box::new(ArrivalGenerator::new()))?;
        engine.spawn(Box::new(OccupancyMonitor::new(interval)))?;

        Ok(Self { engine, seed })
    }

    /// Put a patient of a known class through the door at the current instant
    pub fn admit_patient(&mut self, severity: Severity) -> Result<ProcessId, SimError> {
        let now = self.engine.now();
        let id = self.engine.world_mut().next_patient_id();
        self.engine
            .spawn(Box::new(PatientProcess::new(id, severity, now)))
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver<Clinic>>) {
        self.engine.add_observer(observer);
    }

    pub fn engine(&self) -> &SimulationEngine<Clinic> {
        &self.engine
    }

    pub fn clinic(&self) -> &Clinic {
        self.engine.world()
    }

    /// Advance in fixed increments until arrivals have stopped and the
    /// waiting room is empty, or until the time ceiling.
    pub fn run_to_completion(&mut self) -> Result<RunMetrics, SimError> {
        let (cutoff, step, max_time, duration) = {
            let config = self.engine.world().config();
            (
                config.arrival_cutoff,
                config.termination_step,
                config.max_time,
                config.sim_duration,
            )
        };

        let truncated = loop {
            let target = (self.engine.now() + step).min(max_time);
            self.engine.run_until(target)?;

            let now = self.engine.now();
            let gate = &self.engine.world().gate;
            debug!("t={:.3} {} patients inside", now, gate.occupied());
            if now > cutoff && gate.is_empty() {
                break false;
            }
            if now >= max_time {
                warn!(
                    "seed {}: stopping at time ceiling {} with {} patients inside",
                    self.seed,
                    max_time,
                    gate.occupied()
                );
                self.engine.teardown()?;
                break true;
            }
        };

        let metrics = self
            .engine
            .world()
            .stats
            .summarize(cutoff, duration, truncated);
        info!(
            "seed {} finished at t={:.3}: {} served, {} turned away",
            self.seed,
            self.engine.now(),
            metrics.served.total(),
            metrics.turned_away
        );
        Ok(metrics)
    }
}
