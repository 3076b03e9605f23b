//! Discrete-event scheduler: configuration and execution of a simulation run.

use std::cell::RefCell;
use std::rc::Rc;

use log::Level::Trace;
use log::{log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use serde_json::json;

use crate::context::SimulationContext;
use crate::error::SimulationError;
use crate::event::Event;
use crate::log::{get_colored, log_process_failure, log_scheduler_debug};
use crate::process::{Process, ProcessId, Yield};
use crate::state::SchedulerState;

struct ProcessEntry {
    process: Rc<RefCell<dyn Process>>,
    ctx: SimulationContext,
}

/// Cooperative single-threaded event loop which drives simulation processes.
///
/// Processes are resumed in the order of their wake-up times. Processes waking up at the same time are resumed in
/// the order their wake-ups were enqueued.
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
    processes: Vec<Option<ProcessEntry>>,
}

impl Scheduler {
    /// Creates a new scheduler with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState::new(seed))),
            processes: Vec::new(),
        }
    }

    /// Registers a process which is first resumed at the current simulation time.
    ///
    /// Process ids are assigned sequentially starting from 0. Names are used for logging and error reporting and
    /// need not be unique.
    pub fn schedule_process<S>(&mut self, name: S, process: Rc<RefCell<dyn Process>>) -> ProcessId
    where
        S: AsRef<str>,
    {
        self.schedule_process_after(name, process, 0.)
    }

    /// Registers a process which is first resumed after the specified delay.
    ///
    /// Panics if the delay is negative or not finite, since this is a programming error of the caller.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use fogsim_core::{Process, ProcessError, Scheduler, SimulationContext, Yield};
    ///
    /// struct Once {
    ///     time: f64,
    /// }
    ///
    /// impl Process for Once {
    ///     fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
    ///         self.time = ctx.time();
    ///         Ok(Yield::Finish)
    ///     }
    /// }
    ///
    /// let mut scheduler = Scheduler::new(123);
    /// let process = Rc::new(RefCell::new(Once { time: -1. }));
    /// scheduler.schedule_process_after("once", process.clone(), 1.5);
    /// scheduler.run(10.).unwrap();
    /// assert_eq!(process.borrow().time, 1.5);
    /// ```
    pub fn schedule_process_after<S>(&mut self, name: S, process: Rc<RefCell<dyn Process>>, delay: f64) -> ProcessId
    where
        S: AsRef<str>,
    {
        assert!(
            delay.is_finite() && delay >= 0.,
            "Process delay must be finite and non-negative, got {}",
            delay
        );
        let name = name.as_ref();
        let id = self.state.borrow_mut().register(name);
        let ctx = SimulationContext::new(id, name, self.state.clone());
        self.processes.push(Some(ProcessEntry { process, ctx }));
        let event_id = self.state.borrow_mut().add_event(id, delay);
        log_scheduler_debug(
            self.time(),
            "Scheduled process",
            json!({"name": name, "id": id, "delay": delay, "event": event_id}),
        );
        id
    }

    /// Withdraws the process: its pending resumption is removed and it is never resumed again.
    ///
    /// Has no effect on a process which is finished or already canceled.
    pub fn cancel(&mut self, process: ProcessId) {
        let canceled = self.state.borrow_mut().cancel_process(process);
        if let Some(entry) = self.processes.get_mut(process as usize) {
            if entry.take().is_some() && canceled {
                log_scheduler_debug(self.time(), "Canceled process", json!({ "id": process }));
            }
        }
    }

    /// Returns `true` if the process has a pending resumption.
    pub fn is_pending(&self, process: ProcessId) -> bool {
        self.state.borrow().is_pending(process)
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Returns the total number of enqueued resumptions, including the canceled ones.
    pub fn event_count(&self) -> u64 {
        self.state.borrow().event_count()
    }

    /// Returns the number of processes waiting to be resumed.
    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending_count()
    }

    /// Returns the name of process by its identifier.
    ///
    /// Panics if process with such id does not exist.
    pub fn lookup_name(&self, id: ProcessId) -> String {
        self.state.borrow().lookup_name(id)
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

    /// Resumes the next pending process if its wake-up time does not exceed `until`.
    ///
    /// Returns `Ok(true)` if some process was resumed and `Ok(false)` if there is nothing to do up to `until`.
    pub fn step(&mut self, until: f64) -> Result<bool, SimulationError> {
        let next = self.state.borrow_mut().next_event_until(until);
        match next {
            Some(event) => {
                self.dispatch(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs the simulation up to time `until` inclusively.
    ///
    /// Processes with wake-up times not exceeding `until` are resumed in order. Afterwards the clock is set to
    /// `until` and all processes still suspended beyond it are discarded without being resumed.
    ///
    /// If some process step fails, the run is aborted immediately: every live process is notified via
    /// [`Process::on_abort()`], all pending events are dropped and the failure is returned.
    pub fn run(&mut self, until: f64) -> Result<(), SimulationError> {
        while self.step(until)? {}
        let discarded = self.state.borrow_mut().discard_events(until);
        for entry in self.processes.iter_mut() {
            *entry = None;
        }
        log_scheduler_debug(
            self.time(),
            "Run finished",
            json!({"until": until, "discarded": discarded, "events": self.event_count()}),
        );
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimulationError> {
        let time = event.time;
        let Some(entry) = self.processes.get_mut(event.process as usize).and_then(|e| e.as_mut()) else {
            return Ok(());
        };
        if log_enabled!(Trace) {
            trace!(
                target: entry.ctx.name(),
                "[{:.3} {} {}] {}",
                time,
                get_colored("RESUME", colored::Color::BrightBlack),
                entry.ctx.name(),
                json!({"process": event.process, "event": event.id})
            );
        }
        let result = entry.process.borrow_mut().resume(&mut entry.ctx);
        match result {
            Ok(Yield::Timeout(delay)) if delay.is_finite() && delay >= 0. => {
                if self.state.borrow().is_canceled(event.process) {
                    self.processes[event.process as usize] = None;
                } else {
                    self.state.borrow_mut().add_event(event.process, delay);
                }
                Ok(())
            }
            Ok(Yield::Timeout(delay)) => {
                let process = entry.ctx.name().to_owned();
                let err = SimulationError::InvalidDelay {
                    process,
                    process_id: event.process,
                    time,
                    delay,
                };
                log_process_failure(time, err.process(), event.process, &err);
                self.abort(time);
                Err(err)
            }
            Ok(Yield::Finish) => {
                self.processes[event.process as usize] = None;
                Ok(())
            }
            Err(source) => {
                let process = entry.ctx.name().to_owned();
                log_process_failure(time, &process, event.process, source.as_ref());
                self.abort(time);
                Err(SimulationError::ProcessFailed {
                    process,
                    process_id: event.process,
                    time,
                    source,
                })
            }
        }
    }

    fn abort(&mut self, time: f64) {
        for entry in self.processes.iter_mut().filter_map(|e| e.take()) {
            entry.process.borrow_mut().on_abort(time);
        }
        self.state.borrow_mut().discard_events(time);
    }
}
