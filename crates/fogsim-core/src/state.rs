use std::collections::{BinaryHeap, HashMap, HashSet};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::event::{Event, EventId};
use crate::process::ProcessId;

/// Relative epsilon to compare floating point times for equality.
pub const EPSILON: f64 = 1e-12;

pub struct SchedulerState {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event>,
    canceled_events: HashSet<EventId>,
    pending: HashMap<ProcessId, EventId>,
    canceled_processes: HashSet<ProcessId>,
    event_count: u64,
    process_names: Vec<String>,
}

impl SchedulerState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            canceled_events: HashSet::new(),
            pending: HashMap::new(),
            canceled_processes: HashSet::new(),
            event_count: 0,
            process_names: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &str) -> ProcessId {
        let id = self.process_names.len() as ProcessId;
        self.process_names.push(name.to_owned());
        id
    }

    pub fn lookup_name(&self, id: ProcessId) -> String {
        self.process_names[id as usize].clone()
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    /// Enqueues the next resumption of the process. The delay must be already validated.
    pub fn add_event(&mut self, process: ProcessId, delay: f64) -> EventId {
        let event_id = self.event_count;
        self.events.push(Event {
            id: event_id,
            time: self.clock + delay.max(0.),
            process,
        });
        self.pending.insert(process, event_id);
        self.event_count += 1;
        event_id
    }

    /// Pops the next non-canceled event with time not exceeding `until` and advances the clock to its time.
    ///
    /// Times within a relative tolerance past `until` are treated as `until`.
    pub fn next_event_until(&mut self, until: f64) -> Option<Event> {
        let slack = EPSILON * until.abs().max(1.);
        loop {
            let next_time = self.events.peek()?.time;
            if next_time > until + slack {
                return None;
            }
            let mut event = self.events.pop()?;
            if self.canceled_events.remove(&event.id) {
                continue;
            }
            if event.time > until {
                event.time = until;
            }
            self.pending.remove(&event.process);
            self.clock = event.time;
            return Some(event);
        }
    }

    /// Withdraws the pending event of the process and prevents any further resumption of it.
    ///
    /// Returns `false` if the process was already canceled.
    pub fn cancel_process(&mut self, process: ProcessId) -> bool {
        if let Some(event_id) = self.pending.remove(&process) {
            self.canceled_events.insert(event_id);
        }
        self.canceled_processes.insert(process)
    }

    pub fn is_canceled(&self, process: ProcessId) -> bool {
        self.canceled_processes.contains(&process)
    }

    pub fn is_pending(&self, process: ProcessId) -> bool {
        self.pending.contains_key(&process)
    }

    /// Drops all pending events and moves the clock to `time` if it is ahead of the current one.
    ///
    /// Returns the number of discarded events.
    pub fn discard_events(&mut self, time: f64) -> usize {
        let discarded = self.pending.len();
        self.events.clear();
        self.canceled_events.clear();
        self.pending.clear();
        if time > self.clock {
            self.clock = time;
        }
        discarded
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
