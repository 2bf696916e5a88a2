use super::errors::SimError;
use super::types::ProcessId;
use std::collections::VecDeque;

/// Outcome of a blocking acquisition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// A slot was free and is now held by the requester
    Granted,
    /// The requester joined the wait list and will be handed a slot on release
    Queued,
}

/// Counting semaphore with a FIFO wait list.
///
/// A released slot goes straight to the head of the wait list, so `in_use`
/// never drops while anyone is waiting.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    name: String,
    capacity: usize,
    in_use: usize,
    waiters: VecDeque<ProcessId>,
}

impl ResourcePool {
    /// Create an idle pool with `capacity` slots
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            in_use: 0,
            waiters: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of requesters blocked on this pool
    pub fn queue_len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether a slot can be granted right now
    pub fn is_available(&self) -> bool {
        self.in_use < self.capacity
    }

    /// Take a slot if one is free at this instant. Never touches the wait list.
    pub fn try_acquire(&mut self) -> Result<bool, SimError> {
        if !self.is_available() {
            return Ok(false);
        }
        self.in_use += 1;
        self.check_invariant()?;
        Ok(true)
    }

    /// Take a slot, or join the back of the wait list
    pub fn acquire_blocking(&mut self, requester: ProcessId) -> Result<Acquisition, SimError> {
        if self.waiters.contains(&requester) {
            return Err(SimError::invariant(format!(
                "{} is already waiting on pool '{}'",
                requester, self.name
            )));
        }

        if self.is_available() {
            if !self.waiters.is_empty() {
                return Err(SimError::invariant(format!(
                    "pool '{}' has a free slot while {} requesters wait",
                    self.name,
                    self.waiters.len()
                )));
            }
            self.in_use += 1;
            self.check_invariant()?;
            return Ok(Acquisition::Granted);
        }

        self.waiters.push_back(requester);
        Ok(Acquisition::Queued)
    }

    /// Return a slot. If someone is waiting, the slot is handed to the head of
    /// the queue and that requester is returned so it can be resumed.
    pub fn release(&mut self) -> Result<Option<ProcessId>, SimError> {
        if self.in_use == 0 {
            return Err(SimError::invariant(format!(
                "release on pool '{}' with no slot in use",
                self.name
            )));
        }

        match self.waiters.pop_front() {
            Some(next) => Ok(Some(next)),
            None => {
                self.in_use -= 1;
                Ok(None)
            }
        }
    }

    /// Drop `requester` from the wait list without granting anything.
    /// Returns whether it was waiting.
    pub fn withdraw(&mut self, requester: ProcessId) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|waiter| *waiter != requester);
        self.waiters.len() != before
    }

    fn check_invariant(&self) -> Result<(), SimError> {
        if self.in_use > self.capacity {
            return Err(SimError::invariant(format!(
                "pool '{}' has {} slots in use but capacity {}",
                self.name, self.in_use, self.capacity
            )));
        }
        Ok(())
    }
}
