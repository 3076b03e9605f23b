//! Simulation processes.

use crate::context::SimulationContext;

/// Process identifier, assigned sequentially starting from 0.
pub type ProcessId = u32;

/// Error returned by a process step. Any such error is fatal to the whole run.
pub type ProcessError = Box<dyn std::error::Error>;

/// Tells the scheduler what to do with a process after its current step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Yield {
    /// Resume the process after the specified delay.
    Timeout(f64),
    /// The process is finished and should not be resumed again.
    Finish,
}

/// A long-running unit of work driven by the [`Scheduler`](crate::Scheduler).
///
/// The process keeps its own continuation state: each call to [`resume()`](Process::resume()) continues from the
/// point where the previous step suspended and runs uninterrupted until it returns.
///
/// # Examples
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use fogsim_core::{Process, ProcessError, Scheduler, SimulationContext, Yield};
///
/// // Waits for 2 time units, then records the time and stops.
/// struct Delayed {
///     started: bool,
///     fired_at: Option<f64>,
/// }
///
/// impl Process for Delayed {
///     fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
///         if !self.started {
///             self.started = true;
///             return Ok(Yield::Timeout(2.));
///         }
///         self.fired_at = Some(ctx.time());
///         Ok(Yield::Finish)
///     }
/// }
///
/// let mut scheduler = Scheduler::new(123);
/// let process = Rc::new(RefCell::new(Delayed { started: false, fired_at: None }));
/// scheduler.schedule_process("delayed", process.clone());
/// scheduler.run(10.).unwrap();
/// assert_eq!(process.borrow().fired_at, Some(2.));
/// ```
pub trait Process {
    /// Performs one step of the process at the current simulation time.
    fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError>;

    /// Invoked for every live process when the run is aborted by a failure of some process.
    fn on_abort(&mut self, _time: f64) {}
}
