use super::errors::SimError;
use super::event_scheduler::EventScheduler;
use super::resource_pool::{Acquisition, ResourcePool};
use super::types::{PoolId, ProcessId, SimTime};
use log::trace;
use std::collections::BTreeMap;

/// Where a process suspends after a resumption
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Yield {
    /// Resume again after the given delay
    Timeout(SimTime),
    /// Block on a pool; resumed once a slot has been granted
    Acquire(PoolId),
    /// The process is done and will be dropped
    Finished,
}

/// A resumable unit of work driven by the simulation engine.
///
/// Processes are explicit state machines: each call to `resume` runs until
/// the next suspension point and reports it through [`Yield`].
pub trait Process<W> {
    /// Human-readable label used in logs
    fn name(&self) -> String;

    /// Run until the next suspension point
    fn resume(&mut self, ctx: &mut SimContext<W>, world: &mut W) -> Result<Yield, SimError>;

    /// Called when a run is stopped while this process is still alive.
    /// Implementations give back anything they hold.
    fn teardown(&mut self, _ctx: &mut SimContext<W>, _world: &mut W) -> Result<(), SimError> {
        Ok(())
    }
}

/// Run-scoped kernel state handed to every process: the clock, the resource
/// pools and the queue of processes spawned during the current step.
pub struct SimContext<W> {
    pub(crate) scheduler: EventScheduler,
    pools: Vec<ResourcePool>,
    spawned: Vec<(ProcessId, Box<dyn Process<W>>)>,
    next_process_id: u64,
    /// Blocked requesters that were handed a slot but have not resumed yet
    granted: BTreeMap<ProcessId, PoolId>,
}

impl<W> SimContext<W> {
    pub fn new() -> Self {
        Self {
            scheduler: EventScheduler::new(),
            pools: Vec::new(),
            spawned: Vec::new(),
            next_process_id: 0,
            granted: BTreeMap::new(),
        }
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Register a new pool and return its handle
    pub fn add_pool(&mut self, name: impl Into<String>, capacity: usize) -> PoolId {
        self.pools.push(ResourcePool::new(name, capacity));
        PoolId(self.pools.len() - 1)
    }

    pub fn pool(&self, id: PoolId) -> Result<&ResourcePool, SimError> {
        self.pools.get(id.0).ok_or(SimError::UnknownPool(id))
    }

    pub fn pools(&self) -> &[ResourcePool] {
        &self.pools
    }

    fn pool_mut(&mut self, id: PoolId) -> Result<&mut ResourcePool, SimError> {
        self.pools.get_mut(id.0).ok_or(SimError::UnknownPool(id))
    }

    /// Take a slot only if one is free at this instant. A refusal leaves no
    /// trace on the pool.
    pub fn try_acquire(&mut self, id: PoolId) -> Result<bool, SimError> {
        self.pool_mut(id)?.try_acquire()
    }

    /// Give a slot back. A blocked requester, if any, inherits it and is
    /// resumed at the current instant.
    pub fn release(&mut self, id: PoolId) -> Result<(), SimError> {
        if let Some(next) = self.pool_mut(id)?.release()? {
            trace!("t={:.3} {} handed to {}", self.now(), id, next);
            let now = self.now();
            self.scheduler.schedule_at(now, next)?;
            self.granted.insert(next, id);
        }
        Ok(())
    }

    /// Blocking acquisition on behalf of `requester`. An immediate grant still
    /// goes through the event queue so the requester resumes in FIFO order.
    pub(crate) fn acquire_blocking(
        &mut self,
        id: PoolId,
        requester: ProcessId,
    ) -> Result<(), SimError> {
        match self.pool_mut(id)?.acquire_blocking(requester)? {
            Acquisition::Granted => {
                let now = self.now();
                self.scheduler.schedule_at(now, requester)?;
                self.granted.insert(requester, id);
                Ok(())
            }
            Acquisition::Queued => {
                trace!("t={:.3} {} queued on {}", self.now(), requester, id);
                Ok(())
            }
        }
    }

    /// Start a new process. Its first resumption is scheduled at the current
    /// instant, behind everything already queued for it.
    pub fn spawn(&mut self, process: Box<dyn Process<W>>) -> Result<ProcessId, SimError> {
        let id = ProcessId(self.next_process_id);
        self.next_process_id += 1;
        let now = self.now();
        self.scheduler.schedule_at(now, id)?;
        self.spawned.push((id, process));
        Ok(id)
    }

    /// The process is being resumed, so any slot it was granted is now its own
    pub(crate) fn mark_resumed(&mut self, id: ProcessId) {
        self.granted.remove(&id);
    }

    /// Cancel every pending wait of `live` processes: drop them from the wait
    /// lists, then return slots granted to ones that never resumed. Runs
    /// before the processes give back what they hold.
    pub(crate) fn cancel_waits(&mut self, live: &[ProcessId]) -> Result<(), SimError> {
        for pool in &mut self.pools {
            for id in live {
                pool.withdraw(*id);
            }
        }

        let granted = std::mem::take(&mut self.granted);
        for (id, pool) in granted {
            trace!("t={:.3} revoking {} from {}", self.now(), pool, id);
            if let Some(next) = self.pool_mut(pool)?.release()? {
                return Err(SimError::invariant(format!(
                    "{} still waiting on {} during teardown",
                    next, pool
                )));
            }
        }
        Ok(())
    }

    /// Forget every pending resumption and unadopted spawn
    pub(crate) fn clear_pending(&mut self) {
        self.scheduler.clear();
        self.spawned.clear();
    }

    pub(crate) fn take_spawned(&mut self) -> Vec<(ProcessId, Box<dyn Process<W>>)> {
        std::mem::take(&mut self.spawned)
    }
}

impl<W> Default for SimContext<W> {
    fn default() -> Self {
        Self::new()
    }
}
