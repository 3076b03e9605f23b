#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod capacity;
pub mod error;
pub mod link;
pub mod measurement;
pub mod node;

pub use capacity::Capacity;
pub use error::PowerModelError;
pub use link::{LinkPowerModel, PerBitPowerModel};
pub use measurement::PowerMeasurement;
pub use node::{CapacityBoundPowerModel, ConstantPowerModel, NodePowerModel, RateBoundPowerModel};
