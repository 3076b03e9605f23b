//! Node power models.

use dyn_clone::{clone_trait_object, DynClone};

use crate::capacity::Capacity;
use crate::error::PowerModelError;
use crate::measurement::PowerMeasurement;

/// Computes the power consumption of a compute node from the amount of allocated compute units.
pub trait NodePowerModel: DynClone {
    /// Returns the current power consumption of a node.
    ///
    /// * `time` - current simulation time.
    /// * `used_cu` - compute units currently allocated on the node.
    /// * `capacity` - node capacity in compute units.
    fn get_power(&self, time: f64, used_cu: f64, capacity: Capacity) -> Result<PowerMeasurement, PowerModelError>;

    /// Checks that the model parameters are consistent with each other and with the node capacity.
    fn validate(&self, _capacity: Capacity) -> Result<(), PowerModelError> {
        Ok(())
    }
}

clone_trait_object!(NodePowerModel);

fn check_non_negative(name: &str, value: f64) -> Result<(), PowerModelError> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(PowerModelError::InvalidParameter(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )))
    }
}

/// Linear interpolation between static and maximum power according to the node utilization.
///
/// An idle node draws `static_power`, a fully loaded one draws `max_power`. Requires finite capacity.
#[derive(Clone, Debug)]
pub struct CapacityBoundPowerModel {
    static_power: f64,
    max_power: f64,
}

impl CapacityBoundPowerModel {
    /// Creates the model.
    ///
    /// * `static_power` - power consumption of an idle node.
    /// * `max_power` - power consumption of a fully loaded node.
    pub fn new(static_power: f64, max_power: f64) -> Self {
        Self {
            static_power,
            max_power,
        }
    }

    /// Returns the idle power.
    pub fn static_power(&self) -> f64 {
        self.static_power
    }

    /// Returns the full-load power.
    pub fn max_power(&self) -> f64 {
        self.max_power
    }
}

impl NodePowerModel for CapacityBoundPowerModel {
    fn get_power(&self, _time: f64, used_cu: f64, capacity: Capacity) -> Result<PowerMeasurement, PowerModelError> {
        let Capacity::Finite(limit) = capacity else {
            return Err(PowerModelError::UnboundedCapacity);
        };
        if used_cu <= 0. {
            return Ok(PowerMeasurement::new(self.static_power, 0.));
        }
        if limit <= 0. {
            return Err(PowerModelError::ZeroCapacity { used_cu });
        }
        let utilization = (used_cu / limit).min(1.);
        Ok(PowerMeasurement::new(
            self.static_power,
            utilization * (self.max_power - self.static_power),
        ))
    }

    fn validate(&self, capacity: Capacity) -> Result<(), PowerModelError> {
        check_non_negative("static_power", self.static_power)?;
        check_non_negative("max_power", self.max_power)?;
        if self.max_power < self.static_power {
            return Err(PowerModelError::InvalidParameter(format!(
                "max_power {} is below static_power {}",
                self.max_power, self.static_power
            )));
        }
        match capacity {
            Capacity::Finite(limit) => check_non_negative("capacity", limit),
            Capacity::Unbounded => Err(PowerModelError::UnboundedCapacity),
        }
    }
}

/// Power proportional to the allocated compute units, for nodes with unbounded capacity (e.g. cloud).
#[derive(Clone, Debug)]
pub struct RateBoundPowerModel {
    power_per_cu: f64,
}

impl RateBoundPowerModel {
    /// Creates the model with specified power per allocated compute unit.
    pub fn new(power_per_cu: f64) -> Self {
        Self { power_per_cu }
    }

    /// Returns the power per allocated compute unit.
    pub fn power_per_cu(&self) -> f64 {
        self.power_per_cu
    }
}

impl NodePowerModel for RateBoundPowerModel {
    fn get_power(&self, _time: f64, used_cu: f64, _capacity: Capacity) -> Result<PowerMeasurement, PowerModelError> {
        Ok(PowerMeasurement::dynamic(used_cu.max(0.) * self.power_per_cu))
    }

    fn validate(&self, capacity: Capacity) -> Result<(), PowerModelError> {
        check_non_negative("power_per_cu", self.power_per_cu)?;
        match capacity {
            Capacity::Finite(capacity) => Err(PowerModelError::FiniteCapacity { capacity }),
            Capacity::Unbounded => Ok(()),
        }
    }
}

/// Constant power consumption, e.g. for sensors or other devices whose draw does not depend on load.
#[derive(Clone, Debug)]
pub struct ConstantPowerModel {
    power: f64,
}

impl ConstantPowerModel {
    /// Creates constant power model.
    pub fn new(power: f64) -> Self {
        Self { power }
    }
}

impl NodePowerModel for ConstantPowerModel {
    fn get_power(&self, _time: f64, _used_cu: f64, _capacity: Capacity) -> Result<PowerMeasurement, PowerModelError> {
        Ok(PowerMeasurement::new(self.power, 0.))
    }

    fn validate(&self, _capacity: Capacity) -> Result<(), PowerModelError> {
        check_non_negative("power", self.power)
    }
}
