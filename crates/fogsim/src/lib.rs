#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod application;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod orchestrator;
pub mod placement_algorithms;
pub mod power_meter;
pub mod simulation;

pub use application::{Application, DataFlow, Task, TaskId, TaskRole};
pub use config::ScenarioConfig;
pub use error::{EntityKind, Error, Result};
pub use infrastructure::{Entity, Infrastructure, Link, LinkId, Node, NodeId};
pub use orchestrator::{Orchestrator, PlacementFn, PlacementPolicy, PlacementProcess};
pub use power_meter::{MeterTarget, PowerMeter, PowerSample};
pub use simulation::{PowerSimulation, SimulationReport};
