//! Power model errors.

use thiserror::Error;

/// Error produced when a power model is misconfigured or evaluated in an impossible state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PowerModelError {
    /// A node with zero capacity has a nonzero allocation.
    #[error("zero-capacity node has {used_cu} CU allocated")]
    ZeroCapacity {
        /// Allocated CU.
        used_cu: f64,
    },
    /// The model requires a finite capacity.
    #[error("model requires finite capacity")]
    UnboundedCapacity,
    /// The model requires an unbounded capacity.
    #[error("model requires unbounded capacity, got {capacity}")]
    FiniteCapacity {
        /// Configured capacity.
        capacity: f64,
    },
    /// A model parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
