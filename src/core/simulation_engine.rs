use super::errors::SimError;
use super::process::{Process, SimContext, Yield};
use super::types::{PoolId, ProcessId, SimTime};
use log::{debug, trace};
use std::collections::BTreeMap;

/// Observer trait for simulation events
pub trait SimulationObserver<W> {
    /// Called when the simulated clock advances
    fn on_time_advance(&mut self, _old_time: SimTime, _new_time: SimTime) {}

    /// Called after every resumption. Returning an error stops the run.
    fn on_step_complete(&mut self, ctx: &SimContext<W>, world: &W) -> Result<(), SimError>;
}

/// Cooperative discrete-event engine.
///
/// Exactly one process runs at a time. A process only gives up control at a
/// [`Yield`] point, and resumptions are replayed in `(time, schedule order)`.
pub struct SimulationEngine<W> {
    ctx: SimContext<W>,
    world: W,
    processes: BTreeMap<ProcessId, Box<dyn Process<W>>>,
    observers: Vec<Box<dyn SimulationObserver<W>>>,
    steps: u64,
}

impl<W> SimulationEngine<W> {
    /// Create an engine with an empty context
    pub fn new(world: W) -> Self {
        Self::with_context(SimContext::new(), world)
    }

    /// Create an engine from a context that already has its pools
    pub fn with_context(ctx: SimContext<W>, world: W) -> Self {
        Self {
            ctx,
            world,
            processes: BTreeMap::new(),
            observers: Vec::new(),
            steps: 0,
        }
    }

    /// Add a resource pool to the run
    pub fn add_pool(&mut self, name: impl Into<String>, capacity: usize) -> PoolId {
        self.ctx.add_pool(name, capacity)
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver<W>>) {
        self.observers.push(observer);
    }

    /// Start a process at the current instant
    pub fn spawn(&mut self, process: Box<dyn Process<W>>) -> Result<ProcessId, SimError> {
        let id = self.ctx.spawn(process)?;
        self.adopt_spawned();
        Ok(id)
    }

    fn adopt_spawned(&mut self) {
        for (id, process) in self.ctx.take_spawned() {
            trace!("t={:.3} spawned {} ({})", self.ctx.now(), id, process.name());
            self.processes.insert(id, process);
        }
    }

    fn notify_time_advance(&mut self, old_time: SimTime, new_time: SimTime) {
        for observer in &mut self.observers {
            observer.on_time_advance(old_time, new_time);
        }
    }

    fn notify_step_complete(&mut self) -> Result<(), SimError> {
        for observer in &mut self.observers {
            observer.on_step_complete(&self.ctx, &self.world)?;
        }
        Ok(())
    }

    /// Resume the next pending process, returns true if events remain
    pub fn step(&mut self) -> Result<bool, SimError> {
        let old_time = self.ctx.now();
        let Some(event) = self.ctx.scheduler.pop_next()? else {
            return Ok(false);
        };
        let now = self.ctx.now();
        if now != old_time {
            self.notify_time_advance(old_time, now);
        }

        let id = event.target;
        let mut process = self.processes.remove(&id).ok_or_else(|| {
            SimError::invariant(format!("wake-up at {} for unknown {}", now, id))
        })?;

        trace!("t={:.3} resuming {} ({})", now, id, process.name());
        self.ctx.mark_resumed(id);
        match process.resume(&mut self.ctx, &mut self.world)? {
            Yield::Timeout(delay) => {
                self.ctx.scheduler.schedule_in(delay, id)?;
                self.processes.insert(id, process);
            }
            Yield::Acquire(pool) => {
                self.ctx.acquire_blocking(pool, id)?;
                self.processes.insert(id, process);
            }
            Yield::Finished => {
                trace!("t={:.3} {} finished", now, id);
            }
        }

        self.adopt_spawned();
        self.notify_step_complete()?;
        self.steps += 1;

        Ok(self.ctx.scheduler.has_events())
    }

    /// Process every event strictly before `until`, then move the clock there
    pub fn run_until(&mut self, until: SimTime) -> Result<(), SimError> {
        while let Some(next) = self.ctx.scheduler.peek_next_time() {
            if next >= until {
                break;
            }
            self.step()?;
        }

        let old_time = self.ctx.now();
        self.ctx.scheduler.advance_to(until)?;
        if until != old_time {
            self.notify_time_advance(old_time, until);
        }
        debug!("Advanced to t={:.3} after {} steps", until, self.steps);
        Ok(())
    }

    /// Stop every live process, letting each give back what it holds.
    /// Pending waits are cancelled first and the event queue is emptied
    /// afterwards. Returns how many processes were still alive.
    pub fn teardown(&mut self) -> Result<usize, SimError> {
        let processes = std::mem::take(&mut self.processes);
        let live: Vec<ProcessId> = processes.keys().copied().collect();
        self.ctx.cancel_waits(&live)?;

        for (id, mut process) in processes {
            trace!("t={:.3} tearing down {} ({})", self.ctx.now(), id, process.name());
            process.teardown(&mut self.ctx, &mut self.world)?;
        }
        self.ctx.clear_pending();
        Ok(live.len())
    }

    /// Get current simulation time
    pub fn now(&self) -> SimTime {
        self.ctx.now()
    }

    /// Number of resumptions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of processes that have not finished
    pub fn live_processes(&self) -> usize {
        self.processes.len()
    }

    /// Check if there are pending events in the scheduler
    pub fn has_pending_events(&self) -> bool {
        self.ctx.scheduler.has_events()
    }

    pub fn context(&self) -> &SimContext<W> {
        &self.ctx
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends its label to the world log every `period`, `remaining` times
    struct Ticker {
        label: &'static str,
        period: f64,
        remaining: u32,
    }

    impl Process<Vec<(f64, &'static str)>> for Ticker {
        fn name(&self) -> String {
            self.label.to_string()
        }

        fn resume(
            &mut self,
            ctx: &mut SimContext<Vec<(f64, &'static str)>>,
            world: &mut Vec<(f64, &'static str)>,
        ) -> Result<Yield, SimError> {
            world.push((ctx.now(), self.label));
            if self.remaining == 0 {
                return Ok(Yield::Finished);
            }
            self.remaining -= 1;
            Ok(Yield::Timeout(self.period))
        }
    }

    #[derive(PartialEq)]
    enum HolderState {
        Start,
        Waiting,
        Holding,
    }

    /// Blocks on a pool, records the grant, holds the slot for `hold`
    struct Holder {
        label: &'static str,
        pool: PoolId,
        hold: f64,
        state: HolderState,
    }

    impl Holder {
        fn new(label: &'static str, pool: PoolId) -> Self {
            Self { label, pool, hold: 3.0, state: HolderState::Start }
        }
    }

    impl Process<Vec<(f64, &'static str)>> for Holder {
        fn name(&self) -> String {
            self.label.to_string()
        }

        fn resume(
            &mut self,
            ctx: &mut SimContext<Vec<(f64, &'static str)>>,
            world: &mut Vec<(f64, &'static str)>,
        ) -> Result<Yield, SimError> {
            match self.state {
                HolderState::Start => {
                    self.state = HolderState::Waiting;
                    Ok(Yield::Acquire(self.pool))
                }
                HolderState::Waiting => {
                    world.push((ctx.now(), self.label));
                    self.state = HolderState::Holding;
                    Ok(Yield::Timeout(self.hold))
                }
                HolderState::Holding => {
                    ctx.release(self.pool)?;
                    Ok(Yield::Finished)
                }
            }
        }

        fn teardown(
            &mut self,
            ctx: &mut SimContext<Vec<(f64, &'static str)>>,
            _world: &mut Vec<(f64, &'static str)>,
        ) -> Result<(), SimError> {
            if self.state == HolderState::Holding {
                ctx.release(self.pool)?;
            }
            Ok(())
        }
    }

    fn three_holders() -> (SimulationEngine<Vec<(f64, &'static str)>>, PoolId) {
        let mut engine = SimulationEngine::new(Vec::new());
        let pool = engine.add_pool("desk", 1);
        for label in ["first", "second", "third"] {
            engine.spawn(Box::new(Holder::new(label, pool))).unwrap();
        }
        (engine, pool)
    }

    #[test]
    fn test_interleaves_processes_by_time_then_schedule_order() {
        let mut engine = SimulationEngine::new(Vec::new());
        engine
            .spawn(Box::new(Ticker { label: "a", period: 2.0, remaining: 2 }))
            .unwrap();
        engine
            .spawn(Box::new(Ticker { label: "b", period: 1.0, remaining: 2 }))
            .unwrap();

        while engine.step().unwrap() {}

        let log: Vec<(f64, &str)> = engine.world().clone();
        assert_eq!(
            log,
            vec![
                (0.0, "a"),
                (0.0, "b"),
                (1.0, "b"),
                (2.0, "a"),
                (2.0, "b"),
                (4.0, "a"),
            ]
        );
        assert_eq!(engine.live_processes(), 0);
    }

    #[test]
    fn test_run_until_stops_before_boundary() {
        let mut engine = SimulationEngine::new(Vec::new());
        engine
            .spawn(Box::new(Ticker { label: "t", period: 5.0, remaining: 10 }))
            .unwrap();

        engine.run_until(10.0).unwrap();
        assert_eq!(engine.now(), 10.0);
        // Ticks at 0 and 5; the tick at 10 is still pending
        assert_eq!(engine.world().len(), 2);
        assert!(engine.has_pending_events());
    }

    #[test]
    fn test_blocked_holders_acquire_in_request_order() {
        let (mut engine, pool) = three_holders();

        while engine.step().unwrap() {}

        let grants: Vec<(f64, &str)> = engine.world().clone();
        assert_eq!(grants, vec![(0.0, "first"), (3.0, "second"), (6.0, "third")]);
        assert_eq!(engine.now(), 9.0);
        assert_eq!(engine.context().pool(pool).unwrap().in_use(), 0);
    }

    #[test]
    fn test_teardown_with_holder_and_waiters_frees_pool() {
        let (mut engine, pool) = three_holders();
        // Three acquisitions at t=0, then "first" starts holding
        for _ in 0..4 {
            engine.step().unwrap();
        }
        assert_eq!(engine.context().pool(pool).unwrap().queue_len(), 2);

        assert_eq!(engine.teardown().unwrap(), 3);
        let desk = engine.context().pool(pool).unwrap();
        assert_eq!(desk.in_use(), 0);
        assert_eq!(desk.queue_len(), 0);
        assert!(!engine.has_pending_events());
        assert!(!engine.step().unwrap());
    }

    #[test]
    fn test_teardown_returns_slot_granted_before_resumption() {
        let (mut engine, pool) = three_holders();
        // "first" releases at t=3 and the slot passes to "second", which has
        // not run yet
        for _ in 0..5 {
            engine.step().unwrap();
        }
        assert_eq!(engine.now(), 3.0);
        assert_eq!(engine.context().pool(pool).unwrap().in_use(), 1);
        assert_eq!(engine.context().pool(pool).unwrap().queue_len(), 1);

        assert_eq!(engine.teardown().unwrap(), 2);
        assert_eq!(engine.context().pool(pool).unwrap().in_use(), 0);
        assert!(!engine.has_pending_events());
        assert_eq!(engine.live_processes(), 0);
    }

    struct ClockWatcher {
        advances: std::rc::Rc<std::cell::RefCell<Vec<(f64, f64)>>>,
    }

    impl SimulationObserver<Vec<(f64, &'static str)>> for ClockWatcher {
        fn on_time_advance(&mut self, old_time: SimTime, new_time: SimTime) {
            self.advances.borrow_mut().push((old_time, new_time));
        }

        fn on_step_complete(
            &mut self,
            _ctx: &SimContext<Vec<(f64, &'static str)>>,
            _world: &Vec<(f64, &'static str)>,
        ) -> Result<(), SimError> {
            Ok(())
        }
    }

    #[test]
    fn test_observer_sees_clock_advances() {
        let advances = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut engine = SimulationEngine::new(Vec::new());
        engine.add_observer(Box::new(ClockWatcher { advances: advances.clone() }));
        engine
            .spawn(Box::new(Ticker { label: "a", period: 2.0, remaining: 2 }))
            .unwrap();

        while engine.step().unwrap() {}
        engine.run_until(5.0).unwrap();
        assert_eq!(*advances.borrow(), vec![(0.0, 2.0), (2.0, 4.0), (4.0, 5.0)]);
    }

    struct StepCounter {
        steps: std::rc::Rc<std::cell::Cell<u64>>,
    }

    impl SimulationObserver<Vec<(f64, &'static str)>> for StepCounter {
        fn on_step_complete(
            &mut self,
            _ctx: &SimContext<Vec<(f64, &'static str)>>,
            _world: &Vec<(f64, &'static str)>,
        ) -> Result<(), SimError> {
            self.steps.set(self.steps.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_observer_sees_every_step() {
        let steps = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut engine = SimulationEngine::new(Vec::new());
        engine.add_observer(Box::new(StepCounter { steps: steps.clone() }));
        engine
            .spawn(Box::new(Ticker { label: "t", period: 1.0, remaining: 3 }))
            .unwrap();

        while engine.step().unwrap() {}
        assert_eq!(steps.get(), 4);
        assert_eq!(engine.steps(), 4);
    }
}
