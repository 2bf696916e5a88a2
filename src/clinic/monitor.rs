use super::model::Clinic;
use crate::core::errors::SimError;
use crate::core::process::{Process, SimContext, Yield};

/// Samples waiting-room occupancy at a fixed period for the whole run
pub struct OccupancyMonitor {
    interval: f64,
}

impl OccupancyMonitor {
    pub fn new(interval: f64) -> Self {
        Self { interval }
    }
}

impl Process<Clinic> for OccupancyMonitor {
    fn name(&self) -> String {
        "occupancy monitor".to_string()
    }

    fn resume(&mut self, ctx: &mut SimContext<Clinic>, world: &mut Clinic) -> Result<Yield, SimError> {
        let occupied = world.gate.occupied();
        world.stats.record_occupancy(ctx.now(), occupied);
        Ok(Yield::Timeout(self.interval))
    }
}
