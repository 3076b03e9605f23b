#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod context;
pub mod error;
pub mod event;
pub mod log;
pub mod process;
pub mod scheduler;
mod state;

pub use colored;
pub use context::SimulationContext;
pub use error::SimulationError;
pub use event::{Event, EventId};
pub use process::{Process, ProcessError, ProcessId, Yield};
pub use scheduler::Scheduler;
pub use state::EPSILON;
