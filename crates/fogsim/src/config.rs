//! Scenario configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::application::TaskRole;
use crate::error::{Error, Result};

/// Holds raw scenario config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawScenarioConfig {
    pub seed: Option<u64>,
    pub horizon: Option<f64>,
    pub application: Option<String>,
    pub placement: Option<String>,
    pub placement_delay: Option<f64>,
    pub nodes: Option<Vec<NodeConfig>>,
    pub links: Option<Vec<LinkConfig>>,
    pub tasks: Option<Vec<TaskConfig>>,
    pub flows: Option<Vec<FlowConfig>>,
    pub meters: Option<Vec<MeterConfig>>,
}

/// Parameters of a node power model.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum NodePowerConfig {
    /// Linear between static and max power, requires finite capacity.
    CapacityBound {
        /// Power of an idle node.
        static_power: f64,
        /// Power of a fully loaded node.
        max_power: f64,
    },
    /// Proportional to the allocated compute units, requires unbounded capacity.
    RateBound {
        /// Power per allocated compute unit.
        power_per_cu: f64,
    },
    /// Fixed power regardless of load.
    Constant {
        /// Power value.
        power: f64,
    },
}

/// Holds configuration of a single node.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    /// Node name.
    pub name: String,
    /// Capacity in compute units, absent for unbounded (cloud) nodes.
    pub cu: Option<f64>,
    /// Power model parameters.
    pub power: NodePowerConfig,
}

/// Holds configuration of a single directed link.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct LinkConfig {
    /// Source node name.
    pub src: String,
    /// Destination node name.
    pub dst: String,
    /// Link latency, 0 by default.
    pub latency: Option<f64>,
    /// Bandwidth in bits per time unit, absent for unbounded.
    pub bandwidth: Option<f64>,
    /// Power per transferred bit.
    pub power_per_bit: f64,
}

/// Holds configuration of a single task.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TaskConfig {
    /// Task name.
    pub name: String,
    /// Task role, processing by default.
    pub role: Option<TaskRole>,
    /// Demand in compute units.
    pub cu: f64,
    /// Name of the node the task is bound to.
    /// Must be set for source and sink tasks.
    pub node: Option<String>,
}

/// Holds configuration of a single data flow.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct FlowConfig {
    /// Producer task name.
    pub src: String,
    /// Consumer task name.
    pub dst: String,
    /// Bits transferred per time unit.
    pub bit_rate: f64,
}

/// Holds configuration of a single power meter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct MeterConfig {
    /// Meter name.
    pub name: String,
    /// Observed targets, see [`TargetSpec`] for the syntax.
    pub targets: Vec<String>,
    /// Sampling interval, 1 by default.
    pub interval: Option<f64>,
    /// Delay of the first sample, 0 by default.
    pub delay: Option<f64>,
}

/// Parsed meter target.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TargetSpec {
    /// `node:<name>`
    Node(String),
    /// `link:<src>-><dst>`
    Link(String, String),
    /// `application`
    Application,
    /// `infrastructure`
    Infrastructure,
}

impl FromStr for TargetSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "application" => return Ok(Self::Application),
            "infrastructure" => return Ok(Self::Infrastructure),
            _ => {}
        }
        if let Some(name) = s.strip_prefix("node:") {
            return Ok(Self::Node(name.trim().to_owned()));
        }
        if let Some(endpoints) = s.strip_prefix("link:") {
            if let Some((src, dst)) = endpoints.split_once("->") {
                return Ok(Self::Link(src.trim().to_owned(), dst.trim().to_owned()));
            }
        }
        Err(Error::InvalidConfiguration(format!("can't parse meter target '{}'", s)))
    }
}

/// Represents scenario configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    /// Random seed of the simulation.
    pub seed: u64,
    /// Simulation horizon.
    pub horizon: f64,
    /// Application name.
    pub application: String,
    /// Placement algorithm config string, e.g. `BestFit` or `Random[seed=1]`.
    pub placement: String,
    /// Time at which the application is placed.
    pub placement_delay: f64,
    /// Infrastructure nodes.
    pub nodes: Vec<NodeConfig>,
    /// Infrastructure links.
    pub links: Vec<LinkConfig>,
    /// Application tasks in insertion order.
    pub tasks: Vec<TaskConfig>,
    /// Application data flows.
    pub flows: Vec<FlowConfig>,
    /// Power meters.
    pub meters: Vec<MeterConfig>,
}

impl ScenarioConfig {
    /// Creates scenario config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self> {
        std::fs::read_to_string(file_name)?.parse()
    }
}

impl FromStr for ScenarioConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: RawScenarioConfig = serde_yaml::from_str(s)?;
        Ok(Self {
            seed: raw.seed.unwrap_or(123),
            horizon: raw.horizon.unwrap_or(5.),
            application: raw.application.unwrap_or_else(|| "app".to_owned()),
            placement: raw.placement.unwrap_or_else(|| "FirstFit".to_owned()),
            placement_delay: raw.placement_delay.unwrap_or(0.),
            nodes: raw.nodes.unwrap_or_default(),
            links: raw.links.unwrap_or_default(),
            tasks: raw.tasks.unwrap_or_default(),
            flows: raw.flows.unwrap_or_default(),
            meters: raw.meters.unwrap_or_default(),
        })
    }
}
