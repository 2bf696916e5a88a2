use super::model::Clinic;
use super::patient::PatientProcess;
use crate::core::errors::SimError;
use crate::core::process::{Process, SimContext, Yield};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrivalPhase {
    Opening,
    Open,
}

/// Creates the opening backlog, then one patient per exponential
/// inter-arrival gap until the arrival cutoff.
pub struct ArrivalGenerator {
    phase: ArrivalPhase,
}

impl ArrivalGenerator {
    pub fn new() -> Self {
        Self {
            phase: ArrivalPhase::Opening,
        }
    }

    fn admit_one(ctx: &mut SimContext<Clinic>, world: &mut Clinic) -> Result<(), SimError> {
        let id = world.next_patient_id();
        let severity = world.draw_severity();
        let patient = PatientProcess::new(id, severity, ctx.now());
        ctx.spawn(Box::new(patient))?;
        Ok(())
    }
}

impl Default for ArrivalGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Process<Clinic> for ArrivalGenerator {
    fn name(&self) -> String {
        "arrivals".to_string()
    }

    fn resume(&mut self, ctx: &mut SimContext<Clinic>, world: &mut Clinic) -> Result<Yield, SimError> {
        if self.phase == ArrivalPhase::Opening {
            let backlog = world.sample_initial_backlog();
            debug!("t={:.3} opening with {} patients already waiting", ctx.now(), backlog);
            for _ in 0..backlog {
                Self::admit_one(ctx, world)?;
            }
            self.phase = ArrivalPhase::Open;
        }

        if ctx.now() >= world.config().arrival_cutoff {
            info!(
                "t={:.3} arrival window closed after {} patients",
                ctx.now(),
                world.stats.arrivals()
            );
            return Ok(Yield::Finished);
        }

        Self::admit_one(ctx, world)?;
        Ok(Yield::Timeout(world.sample_interarrival()))
    }
}
