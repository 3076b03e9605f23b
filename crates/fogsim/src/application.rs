//! Application graph: tasks connected by data flows.

use std::collections::HashMap;
use std::fmt;

use fogsim_power_models::PowerMeasurement;
use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, Error, Result};
use crate::infrastructure::{Infrastructure, LinkId, NodeId};

/// Task index in the application, assigned sequentially starting from 0.
pub type TaskId = usize;

/// Role of a task in the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRole {
    /// Produces data, usually pinned to a sensor or device node.
    Source,
    /// Processes data, placed by the orchestrator.
    Processing,
    /// Consumes data, usually pinned to a specific node.
    Sink,
}

impl fmt::Display for TaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Source => "source",
            Self::Processing => "processing",
            Self::Sink => "sink",
        };
        write!(f, "{}", s)
    }
}

/// A unit of application work demanding some compute units.
#[derive(Clone, Debug)]
pub struct Task {
    name: String,
    role: TaskRole,
    cu: f64,
    bound_node: Option<String>,
    node: Option<NodeId>,
}

impl Task {
    /// Creates an unbound task.
    pub fn new(name: &str, role: TaskRole, cu: f64) -> Self {
        Self {
            name: name.to_owned(),
            role,
            cu,
            bound_node: None,
            node: None,
        }
    }

    /// Creates a source task pinned to the specified node.
    pub fn source(name: &str, cu: f64, node: &str) -> Self {
        Self::new(name, TaskRole::Source, cu).bound_to(node)
    }

    /// Creates a processing task.
    pub fn processing(name: &str, cu: f64) -> Self {
        Self::new(name, TaskRole::Processing, cu)
    }

    /// Creates a sink task pinned to the specified node.
    pub fn sink(name: &str, cu: f64, node: &str) -> Self {
        Self::new(name, TaskRole::Sink, cu).bound_to(node)
    }

    /// Declares the node the task must be placed on.
    pub fn bound_to(mut self, node: &str) -> Self {
        self.bound_node = Some(node.to_owned());
        self
    }

    /// Task name, unique within the application.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task role.
    pub fn role(&self) -> TaskRole {
        self.role
    }

    /// Compute units demanded by the task.
    pub fn cu(&self) -> f64 {
        self.cu
    }

    /// Name of the node declared at construction, if any.
    pub fn bound_node(&self) -> Option<&str> {
        self.bound_node.as_deref()
    }

    /// Node hosting the task, `None` until placed.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }
}

/// Directed data dependency between two tasks.
#[derive(Clone, Debug)]
pub struct DataFlow {
    src: TaskId,
    dst: TaskId,
    bit_rate: f64,
    route: Vec<LinkId>,
}

impl DataFlow {
    /// Producing task.
    pub fn src(&self) -> TaskId {
        self.src
    }

    /// Consuming task.
    pub fn dst(&self) -> TaskId {
        self.dst
    }

    /// Bits transferred per time unit.
    pub fn bit_rate(&self) -> f64 {
        self.bit_rate
    }

    /// Links traversed by the flow, empty until placed or if both tasks share a node.
    pub fn route(&self) -> &[LinkId] {
        &self.route
    }
}

/// A task graph with data flows between tasks.
///
/// Tasks are kept in insertion order, which is the default placement order.
#[derive(Clone, Debug)]
pub struct Application {
    name: String,
    tasks: Vec<Task>,
    task_ids: HashMap<String, TaskId>,
    flows: Vec<DataFlow>,
    placed: bool,
}

impl Application {
    /// Creates empty application.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            tasks: Vec::new(),
            task_ids: HashMap::new(),
            flows: Vec::new(),
            placed: false,
        }
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a task and the flows it consumes.
    ///
    /// Each incoming flow is a pair of the producer task name and the bit rate. Producers must be added before their
    /// consumers.
    pub fn add_task(&mut self, task: Task, incoming: &[(&str, f64)]) -> Result<TaskId> {
        if self.placed {
            return Err(Error::AlreadyPlaced(self.name.clone()));
        }
        if self.task_ids.contains_key(&task.name) {
            return Err(Error::DuplicateIdentity {
                kind: EntityKind::Task,
                name: task.name,
            });
        }
        if !(task.cu.is_finite() && task.cu >= 0.) {
            return Err(Error::InvalidConfiguration(format!(
                "task '{}': CU demand must be finite and non-negative, got {}",
                task.name, task.cu
            )));
        }
        let mut producers = Vec::with_capacity(incoming.len());
        for &(producer, bit_rate) in incoming {
            let Some(&src) = self.task_ids.get(producer) else {
                return Err(Error::UnknownProducer {
                    task: task.name,
                    producer: producer.to_owned(),
                });
            };
            if !(bit_rate.is_finite() && bit_rate >= 0.) {
                return Err(Error::InvalidConfiguration(format!(
                    "flow {} -> {}: bit rate must be finite and non-negative, got {}",
                    producer, task.name, bit_rate
                )));
            }
            producers.push((src, bit_rate));
        }
        let id = self.tasks.len();
        self.task_ids.insert(task.name.clone(), id);
        self.tasks.push(Task { node: None, ..task });
        self.flows.extend(producers.into_iter().map(|(src, bit_rate)| DataFlow {
            src,
            dst: id,
            bit_rate,
            route: Vec::new(),
        }));
        Ok(id)
    }

    /// Returns task by its name.
    pub fn task(&self, name: &str) -> Result<&Task> {
        self.task_id(name).map(|id| &self.tasks[id])
    }

    /// Returns the id of task with specified name.
    pub fn task_id(&self, name: &str) -> Result<TaskId> {
        self.task_ids
            .get(name)
            .copied()
            .ok_or_else(|| Error::not_found(EntityKind::Task, name))
    }

    /// Returns task by its id.
    ///
    /// Panics if task with such id does not exist.
    pub fn task_by_id(&self, id: TaskId) -> &Task {
        &self.tasks[id]
    }

    /// Returns all tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns all data flows in insertion order.
    pub fn flows(&self) -> &[DataFlow] {
        &self.flows
    }

    /// Returns the number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the application is placed onto an infrastructure.
    pub fn is_placed(&self) -> bool {
        self.placed
    }

    /// Returns the total compute units demanded by all tasks.
    pub fn total_cu(&self) -> f64 {
        self.tasks.iter().map(|t| t.cu).sum()
    }

    pub(crate) fn bind(&mut self, task: TaskId, node: NodeId) {
        self.tasks[task].node = Some(node);
    }

    pub(crate) fn set_route(&mut self, flow: usize, route: Vec<LinkId>) {
        self.flows[flow].route = route;
    }

    pub(crate) fn set_placed(&mut self, placed: bool) {
        self.placed = placed;
    }

    /// Unbinds all tasks and clears flow routes.
    pub(crate) fn reset_placement(&mut self) {
        for task in &mut self.tasks {
            task.node = None;
        }
        for flow in &mut self.flows {
            flow.route.clear();
        }
        self.placed = false;
    }

    /// Returns the power attributable to the application.
    ///
    /// Each placed task contributes the share of its host node power proportional to the task demand in the node
    /// usage, and each routed flow contributes the share of every traversed link power proportional to its bit rate
    /// in the link usage. Tasks which are not placed contribute nothing.
    pub fn power(&self, infrastructure: &Infrastructure, time: f64) -> Result<PowerMeasurement> {
        let mut total = PowerMeasurement::default();
        for task in &self.tasks {
            let Some(node_id) = task.node else {
                continue;
            };
            let node = infrastructure.node_by_id(node_id);
            if node.used_cu() > 0. {
                total += node.power(time)? * (task.cu / node.used_cu());
            }
        }
        for flow in &self.flows {
            for &link_id in &flow.route {
                let link = infrastructure.link_by_id(link_id);
                if link.used_bandwidth() > 0. {
                    total += link.power(time)? * (flow.bit_rate / link.used_bandwidth());
                }
            }
        }
        Ok(total)
    }
}
