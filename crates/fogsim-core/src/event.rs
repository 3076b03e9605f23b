//! Scheduler events.

use std::cmp::Ordering;

use crate::process::ProcessId;

/// Event identifier.
///
/// Identifiers are assigned sequentially, so a smaller id means the event was enqueued earlier.
pub type EventId = u64;

/// A pending resumption of some process at some time.
#[derive(Clone, Debug)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Time at which the process is resumed.
    pub time: f64,
    /// Process to resume.
    pub process: ProcessId,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted to be used with BinaryHeap: the earliest event, and among simultaneous events the first enqueued,
// is the greatest one.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
