//! Link power models.

use dyn_clone::{clone_trait_object, DynClone};

use crate::error::PowerModelError;
use crate::measurement::PowerMeasurement;

/// Computes the power consumption of a network link from the traffic it carries.
pub trait LinkPowerModel: DynClone {
    /// Returns the current power consumption of a link.
    ///
    /// * `time` - current simulation time.
    /// * `bits` - bits transferred over the link during a unit interval.
    fn get_power(&self, time: f64, bits: f64) -> Result<PowerMeasurement, PowerModelError>;

    /// Checks the model parameters.
    fn validate(&self) -> Result<(), PowerModelError> {
        Ok(())
    }
}

clone_trait_object!(LinkPowerModel);

/// Power proportional to the transferred bits.
#[derive(Clone, Debug)]
pub struct PerBitPowerModel {
    power_per_bit: f64,
}

impl PerBitPowerModel {
    /// Creates the model with specified power per transferred bit.
    pub fn new(power_per_bit: f64) -> Self {
        Self { power_per_bit }
    }

    /// Returns the power per transferred bit.
    pub fn power_per_bit(&self) -> f64 {
        self.power_per_bit
    }
}

impl LinkPowerModel for PerBitPowerModel {
    fn get_power(&self, _time: f64, bits: f64) -> Result<PowerMeasurement, PowerModelError> {
        Ok(PowerMeasurement::dynamic(bits.max(0.) * self.power_per_bit))
    }

    fn validate(&self) -> Result<(), PowerModelError> {
        if self.power_per_bit.is_finite() && self.power_per_bit >= 0. {
            Ok(())
        } else {
            Err(PowerModelError::InvalidParameter(format!(
                "power_per_bit must be finite and non-negative, got {}",
                self.power_per_bit
            )))
        }
    }
}
