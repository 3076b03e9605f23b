//! Accessing simulation from processes.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::process::ProcessId;
use crate::state::SchedulerState;

/// A facade for accessing the simulation state from a running process.
pub struct SimulationContext {
    id: ProcessId,
    name: String,
    state: Rc<RefCell<SchedulerState>>,
}

impl SimulationContext {
    pub(crate) fn new(id: ProcessId, name: &str, state: Rc<RefCell<SchedulerState>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            state,
        }
    }

    /// Returns the identifier of process associated with this context.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Returns the name of process associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.state.borrow_mut().sample_from_distribution(dist)
    }

    /// Withdraws another process before it is resumed again.
    ///
    /// Canceling the process associated with this context stops it after the current step.
    pub fn cancel(&mut self, process: ProcessId) {
        self.state.borrow_mut().cancel_process(process);
    }

    /// Lookup process name by its identifier.
    pub fn lookup_name(&self, id: ProcessId) -> String {
        self.state.borrow().lookup_name(id)
    }
}
