use super::types::{ProcessId, SimTime};
use std::cmp::Ordering;

/// A pending resumption of a process at a simulated instant
#[derive(Debug, Clone, Copy)]
pub struct ScheduledEvent {
    pub time: SimTime,
    pub sequence_num: u64,
    pub target: ProcessId,
}

impl ScheduledEvent {
    pub fn new(time: SimTime, sequence_num: u64, target: ProcessId) -> Self {
        Self {
            time,
            sequence_num,
            target,
        }
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.sequence_num.cmp(&self.sequence_num))
    }
}
