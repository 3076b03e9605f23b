//! Simulation run errors.

use thiserror::Error;

use crate::process::{ProcessError, ProcessId};

/// Terminal error of a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A process step returned an error.
    #[error("process '{process}' ({process_id}) failed at time {time:.3}: {source}")]
    ProcessFailed {
        /// Name of the failed process.
        process: String,
        /// Id of the failed process.
        process_id: ProcessId,
        /// Simulation time of the failure.
        time: f64,
        /// Error returned by the process.
        #[source]
        source: ProcessError,
    },
    /// A process requested a negative or non-finite delay.
    #[error("process '{process}' ({process_id}) requested invalid delay {delay} at time {time:.3}")]
    InvalidDelay {
        /// Name of the process.
        process: String,
        /// Id of the process.
        process_id: ProcessId,
        /// Simulation time of the request.
        time: f64,
        /// Requested delay.
        delay: f64,
    },
}

impl SimulationError {
    /// Returns the name of the process which caused the error.
    pub fn process(&self) -> &str {
        match self {
            Self::ProcessFailed { process, .. } | Self::InvalidDelay { process, .. } => process,
        }
    }

    /// Returns the simulation time at which the error occurred.
    pub fn time(&self) -> f64 {
        match self {
            Self::ProcessFailed { time, .. } | Self::InvalidDelay { time, .. } => *time,
        }
    }
}
