use super::errors::SimError;
use super::event::ScheduledEvent;
use super::types::{ProcessId, SimTime};
use std::collections::BinaryHeap;

/// Simulated clock plus the ordered queue of pending resumptions.
///
/// Events are popped by `(time, sequence_num)`, so resumptions at the same
/// instant come out in the order they were scheduled.
#[derive(Debug, Default)]
pub struct EventScheduler {
    event_queue: BinaryHeap<ScheduledEvent>,
    sequence_counter: u64,
    now: SimTime,
}

impl EventScheduler {
    /// Create a new EventScheduler at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `target` to resume at the absolute instant `time`
    pub fn schedule_at(&mut self, time: SimTime, target: ProcessId) -> Result<(), SimError> {
        if !time.is_finite() {
            return Err(SimError::invariant(format!(
                "cannot schedule {} at non-finite time {}",
                target, time
            )));
        }
        if time < self.now {
            return Err(SimError::invariant(format!(
                "cannot schedule {} at {} before current time {}",
                target, time, self.now
            )));
        }

        self.event_queue
            .push(ScheduledEvent::new(time, self.sequence_counter, target));
        self.sequence_counter += 1;
        Ok(())
    }

    /// Schedule `target` to resume after `delay` time units
    pub fn schedule_in(&mut self, delay: SimTime, target: ProcessId) -> Result<(), SimError> {
        if delay.is_nan() || delay < 0.0 {
            return Err(SimError::invariant(format!(
                "{} requested invalid delay {}",
                target, delay
            )));
        }
        self.schedule_at(self.now + delay, target)
    }

    /// Pop the earliest event and advance the clock to its timestamp
    pub fn pop_next(&mut self) -> Result<Option<ScheduledEvent>, SimError> {
        let Some(event) = self.event_queue.pop() else {
            return Ok(None);
        };
        if event.time < self.now {
            return Err(SimError::invariant(format!(
                "time moved backwards from {} to {}",
                self.now, event.time
            )));
        }
        self.now = event.time;
        Ok(Some(event))
    }

    /// Move the clock forward without processing anything
    pub fn advance_to(&mut self, time: SimTime) -> Result<(), SimError> {
        if time < self.now {
            return Err(SimError::invariant(format!(
                "cannot rewind clock from {} to {}",
                self.now, time
            )));
        }
        if let Some(next) = self.peek_next_time() {
            if next < time {
                return Err(SimError::invariant(format!(
                    "advancing to {} would skip an event at {}",
                    time, next
                )));
            }
        }
        self.now = time;
        Ok(())
    }

    /// Drop every pending event, keeping the clock where it is
    pub fn clear(&mut self) {
        self.event_queue.clear();
    }

    /// Check if there are any events remaining in the queue
    pub fn has_events(&self) -> bool {
        !self.event_queue.is_empty()
    }

    /// Number of pending events
    pub fn pending(&self) -> usize {
        self.event_queue.len()
    }

    /// Get the next event time without removing it
    pub fn peek_next_time(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|event| event.time)
    }
}
