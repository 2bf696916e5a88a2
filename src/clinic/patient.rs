use super::gate::Admission;
use super::model::Clinic;
use super::stats::DepartureRecord;
use crate::core::errors::SimError;
use crate::core::process::{Process, SimContext, Yield};
use crate::core::types::{PoolId, SimTime};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Simple,
    Moderate,
    Complex,
}

/// Who performed triage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriagePath {
    /// A nurse was free on arrival
    Nurse,
    /// No nurse was free but a general doctor was
    GeneralDoctor,
    /// Nobody was free; queued for the next nurse
    NurseAfterWait,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PatientState {
    Arrived,
    WaitingForNurse,
    InTriage { staff: PoolId },
    WaitingForTreatment { pool: PoolId },
    InTreatment { held: Option<PoolId> },
    Departed,
}

/// One patient's trip through the clinic
pub struct PatientProcess {
    id: u64,
    severity: Severity,
    arrived_at: SimTime,
    state: PatientState,
    triage_wait: SimTime,
    triage_time: SimTime,
    triage_finished_at: SimTime,
    treatment_wait: Option<SimTime>,
    holds_token: bool,
}

impl PatientProcess {
    pub fn new(id: u64, severity: Severity, arrived_at: SimTime) -> Self {
        Self {
            id,
            severity,
            arrived_at,
            state: PatientState::Arrived,
            triage_wait: 0.0,
            triage_time: 0.0,
            triage_finished_at: arrived_at,
            treatment_wait: None,
            holds_token: false,
        }
    }

    fn arrive(&mut self, ctx: &mut SimContext<Clinic>, world: &mut Clinic) -> Result<Yield, SimError> {
        let now = ctx.now();
        world.stats.record_arrival(self.severity);

        if world.gate.try_enter() == Admission::Refused {
            debug!("t={:.3} patient {} turned away", now, self.id);
            world.stats.record_turned_away();
            self.state = PatientState::Departed;
            return Ok(Yield::Finished);
        }
        self.holds_token = true;
        debug!(
            "t={:.3} patient {} admitted ({:?}), {} inside",
            now,
            self.id,
            self.severity,
            world.gate.occupied()
        );

        let pools = world.pools();
        if ctx.try_acquire(pools.nurses)? {
            return Ok(self.start_triage(ctx, world, TriagePath::Nurse, pools.nurses));
        }
        if ctx.try_acquire(pools.general_doctors)? {
            return Ok(self.start_triage(ctx, world, TriagePath::GeneralDoctor, pools.general_doctors));
        }

        self.state = PatientState::WaitingForNurse;
        Ok(Yield::Acquire(pools.nurses))
    }

    fn start_triage(
        &mut self,
        ctx: &SimContext<Clinic>,
        world: &mut Clinic,
        path: TriagePath,
        staff: PoolId,
    ) -> Yield {
        self.triage_wait = ctx.now() - self.arrived_at;
        self.triage_time = world.sample_triage();
        world.stats.record_triage(path, self.triage_wait);
        debug!(
            "t={:.3} patient {} triage via {:?} after {:.3}",
            ctx.now(),
            self.id,
            path,
            self.triage_wait
        );
        self.state = PatientState::InTriage { staff };
        Yield::Timeout(self.triage_time)
    }

    fn finish_triage(
        &mut self,
        ctx: &mut SimContext<Clinic>,
        world: &mut Clinic,
        staff: PoolId,
    ) -> Result<Yield, SimError> {
        ctx.release(staff)?;
        self.triage_finished_at = ctx.now();
        match world.treatment_pool(self.severity) {
            None => Ok(self.start_treatment(world, None)),
            Some(pool) => {
                self.state = PatientState::WaitingForTreatment { pool };
                Ok(Yield::Acquire(pool))
            }
        }
    }

    fn start_treatment(&mut self, world: &mut Clinic, held: Option<PoolId>) -> Yield {
        self.state = PatientState::InTreatment { held };
        Yield::Timeout(world.sample_treatment(self.severity))
    }

    fn depart(
        &mut self,
        ctx: &mut SimContext<Clinic>,
        world: &mut Clinic,
        held: Option<PoolId>,
    ) -> Result<Yield, SimError> {
        if let Some(pool) = held {
            ctx.release(pool)?;
        }

        let now = ctx.now();
        let record = DepartureRecord {
            severity: self.severity,
            system_time: now - self.arrived_at,
            total_wait: self.triage_wait + self.treatment_wait.unwrap_or(0.0),
            departed_at: now,
        };
        world.gate.leave()?;
        self.holds_token = false;
        let cutoff = world.config().arrival_cutoff;
        world.stats.record_departure(record, cutoff);
        debug!(
            "t={:.3} patient {} departed after {:.3} (waited {:.3})",
            now, self.id, record.system_time, record.total_wait
        );

        self.state = PatientState::Departed;
        Ok(Yield::Finished)
    }
}

impl Process<Clinic> for PatientProcess {
    fn name(&self) -> String {
        format!("patient {} ({:?})", self.id, self.severity)
    }

    fn resume(&mut self, ctx: &mut SimContext<Clinic>, world: &mut Clinic) -> Result<Yield, SimError> {
        match self.state {
            PatientState::Arrived => self.arrive(ctx, world),
            PatientState::WaitingForNurse => {
                let nurses = world.pools().nurses;
                Ok(self.start_triage(ctx, world, TriagePath::NurseAfterWait, nurses))
            }
            PatientState::InTriage { staff } => self.finish_triage(ctx, world, staff),
            PatientState::WaitingForTreatment { pool } => {
                let wait = ctx.now() - self.triage_finished_at;
                self.treatment_wait = Some(wait);
                world.stats.record_treatment_wait(self.severity, wait);
                Ok(self.start_treatment(world, Some(pool)))
            }
            PatientState::InTreatment { held } => self.depart(ctx, world, held),
            PatientState::Departed => Err(SimError::invariant(format!(
                "patient {} resumed after departing",
                self.id
            ))),
        }
    }

    fn teardown(&mut self, ctx: &mut SimContext<Clinic>, world: &mut Clinic) -> Result<(), SimError> {
        match self.state {
            PatientState::InTriage { staff } => ctx.release(staff)?,
            PatientState::InTreatment { held: Some(pool) } => ctx.release(pool)?,
            _ => {}
        }
        if self.holds_token {
            world.gate.leave()?;
            self.holds_token = false;
            world.stats.record_abandoned();
        }
        self.state = PatientState::Departed;
        Ok(())
    }
}
