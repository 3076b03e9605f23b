//! Placement algorithms for processing tasks.
//!
//! All algorithms honor the node a task is bound to at construction. Otherwise they select among the nodes which
//! can still fit the task demand, in node registration order.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::application::{Application, Task};
use crate::error::{Error, Result};
use crate::infrastructure::{Infrastructure, NodeId};
use crate::orchestrator::{bound_node, PlacementPolicy};

fn candidates<'a>(task: &'a Task, infrastructure: &'a Infrastructure) -> impl Iterator<Item = NodeId> + 'a {
    infrastructure
        .nodes()
        .iter()
        .enumerate()
        .filter(move |(_, node)| node.fits(task.cu()))
        .map(|(id, _)| id)
}

fn remaining(infrastructure: &Infrastructure, node: NodeId) -> f64 {
    infrastructure.node_by_id(node).remaining_cu().unwrap_or(f64::INFINITY)
}

/// Splits `Name[key=value,...]` into the algorithm name and its options.
fn split_algorithm_config(config_str: &str) -> Result<(&str, Vec<(&str, &str)>)> {
    let malformed = || Error::InvalidConfiguration(format!("malformed placement algorithm '{}'", config_str));
    let config_str = config_str.trim();
    let Some((name, rest)) = config_str.split_once('[') else {
        return Ok((config_str, Vec::new()));
    };
    let body = rest.strip_suffix(']').ok_or_else(malformed)?;
    let mut options = Vec::new();
    for option in body.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        let (key, value) = option.split_once('=').ok_or_else(malformed)?;
        options.push((key.trim(), value.trim()));
    }
    Ok((name.trim(), options))
}

/// Returns a config-resolved placement policy.
///
/// Supported values: `FirstFit`, `BestFit`, `WorstFit`, `Random` and `Random[seed=<u64>]`. The random algorithm
/// uses `seed` unless the option overrides it. Unknown options are rejected.
pub fn placement_algorithm_resolver(config_str: &str, seed: u64) -> Result<Box<dyn PlacementPolicy>> {
    let (algorithm_name, options) = split_algorithm_config(config_str)?;
    let mut seed = seed;
    for (key, value) in options {
        match (algorithm_name, key) {
            ("Random", "seed") => {
                seed = value.parse().map_err(|_| {
                    Error::InvalidConfiguration(format!("can't parse seed '{}' in '{}'", value, config_str))
                })?
            }
            _ => {
                return Err(Error::InvalidConfiguration(format!(
                    "unknown option '{}' in '{}'",
                    key, config_str
                )))
            }
        }
    }
    match algorithm_name {
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        "Random" => Ok(Box::new(RandomFit::new(seed))),
        _ => Err(Error::InvalidConfiguration(format!(
            "unknown placement algorithm '{}'",
            config_str
        ))),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses the first node which fits the task.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    /// Creates the algorithm.
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementPolicy for FirstFit {
    fn processing_task_placement(
        &mut self,
        task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        if task.bound_node().is_some() {
            return bound_node(task, infrastructure);
        }
        candidates(task, infrastructure)
            .next()
            .ok_or_else(|| Error::Unplaceable(task.name().to_owned()))
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses the fitting node with the least remaining capacity, so that finite nodes are filled before unbounded ones.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    /// Creates the algorithm.
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementPolicy for BestFit {
    fn processing_task_placement(
        &mut self,
        task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        if task.bound_node().is_some() {
            return bound_node(task, infrastructure);
        }
        let mut result: Option<NodeId> = None;
        let mut min_remaining = f64::INFINITY;
        for node in candidates(task, infrastructure) {
            let rem = remaining(infrastructure, node);
            if result.is_none() || rem < min_remaining {
                min_remaining = rem;
                result = Some(node);
            }
        }
        result.ok_or_else(|| Error::Unplaceable(task.name().to_owned()))
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses the fitting node with the most remaining capacity; unbounded nodes are preferred.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    /// Creates the algorithm.
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementPolicy for WorstFit {
    fn processing_task_placement(
        &mut self,
        task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        if task.bound_node().is_some() {
            return bound_node(task, infrastructure);
        }
        let mut result: Option<NodeId> = None;
        let mut max_remaining = f64::NEG_INFINITY;
        for node in candidates(task, infrastructure) {
            let rem = remaining(infrastructure, node);
            if rem > max_remaining {
                max_remaining = rem;
                result = Some(node);
            }
        }
        result.ok_or_else(|| Error::Unplaceable(task.name().to_owned()))
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Uses a uniformly random fitting node, drawn from its own seeded generator.
pub struct RandomFit {
    rand: Pcg64,
}

impl RandomFit {
    /// Creates the algorithm with specified seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl PlacementPolicy for RandomFit {
    fn processing_task_placement(
        &mut self,
        task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        if task.bound_node().is_some() {
            return bound_node(task, infrastructure);
        }
        let nodes: Vec<NodeId> = candidates(task, infrastructure).collect();
        nodes
            .choose(&mut self.rand)
            .copied()
            .ok_or_else(|| Error::Unplaceable(task.name().to_owned()))
    }
}

