//! Power measurement.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

use serde::Serialize;

/// Instantaneous power split into the static (idle) and the dynamic (load-dependent) parts, in W.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PowerMeasurement {
    /// Power drawn regardless of load.
    pub static_power: f64,
    /// Power caused by the current load.
    pub dynamic_power: f64,
}

impl PowerMeasurement {
    /// Creates measurement with specified parts.
    pub fn new(static_power: f64, dynamic_power: f64) -> Self {
        Self {
            static_power,
            dynamic_power,
        }
    }

    /// Creates measurement with zero static part.
    pub fn dynamic(dynamic_power: f64) -> Self {
        Self::new(0., dynamic_power)
    }

    /// Returns the total power.
    pub fn total(&self) -> f64 {
        self.static_power + self.dynamic_power
    }
}

impl Add for PowerMeasurement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.static_power + rhs.static_power, self.dynamic_power + rhs.dynamic_power)
    }
}

impl AddAssign for PowerMeasurement {
    fn add_assign(&mut self, rhs: Self) {
        self.static_power += rhs.static_power;
        self.dynamic_power += rhs.dynamic_power;
    }
}

impl Mul<f64> for PowerMeasurement {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self::new(self.static_power * factor, self.dynamic_power * factor)
    }
}

impl Sum for PowerMeasurement {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, m| acc + m)
    }
}
