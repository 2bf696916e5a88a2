use crate::core::errors::SimError;

/// Result of trying to enter the waiting room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Waiting room full; the patient goes home
    Refused,
}

/// Bounded waiting room. Holds one token per place; a patient keeps a token
/// from arrival until departure.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    capacity: usize,
    available: usize,
}

impl AdmissionGate {
    /// Create a gate with every place free
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            available: capacity,
        }
    }

    pub fn try_enter(&mut self) -> Admission {
        if self.available == 0 {
            return Admission::Refused;
        }
        self.available -= 1;
        Admission::Admitted
    }

    pub fn leave(&mut self) -> Result<(), SimError> {
        if self.available >= self.capacity {
            return Err(SimError::invariant(format!(
                "waiting room token returned while all {} places are free",
                self.capacity
            )));
        }
        self.available += 1;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free places
    pub fn available(&self) -> usize {
        self.available
    }

    /// Patients currently inside (waiting or being seen)
    pub fn occupied(&self) -> usize {
        self.capacity - self.available
    }

    /// True when nobody is inside
    pub fn is_empty(&self) -> bool {
        self.available == self.capacity
    }
}
