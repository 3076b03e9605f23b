//! Resource capacity.

use std::fmt;

use crate::error::PowerModelError;

/// Capacity of a node (in CU) or a link (in bits per time unit).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Capacity {
    /// Finite capacity.
    Finite(f64),
    /// No capacity limit, e.g. a cloud node.
    Unbounded,
}

impl Capacity {
    /// Returns `true` if `amount` can be added to `used` without exceeding the capacity.
    pub fn fits(&self, used: f64, amount: f64) -> bool {
        match self {
            Self::Finite(limit) => used + amount <= *limit + 1e-9,
            Self::Unbounded => true,
        }
    }

    /// Returns the capacity left after `used`, or `None` if the capacity is unbounded.
    pub fn remaining(&self, used: f64) -> Option<f64> {
        match self {
            Self::Finite(limit) => Some((limit - used).max(0.)),
            Self::Unbounded => None,
        }
    }

    /// Checks that a finite capacity is a non-negative number.
    pub fn validate(&self) -> Result<(), PowerModelError> {
        match self {
            Self::Finite(limit) if !(limit.is_finite() && *limit >= 0.) => Err(PowerModelError::InvalidParameter(
                format!("capacity must be finite and non-negative, got {}", limit),
            )),
            _ => Ok(()),
        }
    }

    /// Returns `true` for [`Capacity::Unbounded`].
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl From<Option<f64>> for Capacity {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Unbounded, Self::Finite)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(limit) => write!(f, "{}", limit),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}
