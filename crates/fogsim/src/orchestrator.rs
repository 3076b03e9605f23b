//! Placement of application tasks onto infrastructure nodes.

use std::cell::RefCell;
use std::rc::Rc;

use fogsim_core::{log_info, log_warn, Process, ProcessError, ProcessId, Scheduler, SimulationContext, Yield};
use log::{debug, warn};

use crate::application::{Application, Task, TaskId, TaskRole};
use crate::error::{Error, Result};
use crate::infrastructure::{Infrastructure, NodeId};

/// Decides which node hosts each task.
///
/// Only the placement of processing tasks must be supplied. Source and sink tasks are placed on the node they are
/// bound to at construction, which can be changed by overriding the corresponding methods.
pub trait PlacementPolicy {
    /// Selects the node for a processing task.
    fn processing_task_placement(
        &mut self,
        task: &Task,
        application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId>;

    /// Selects the node for a source task.
    fn source_task_placement(
        &mut self,
        task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        bound_node(task, infrastructure)
    }

    /// Selects the node for a sink task.
    fn sink_task_placement(
        &mut self,
        task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        bound_node(task, infrastructure)
    }

    /// Returns the order in which tasks are placed, by default the insertion order.
    fn placement_order(&self, application: &Application) -> Vec<TaskId> {
        (0..application.task_count()).collect()
    }
}

/// Resolves the node the task is bound to at construction.
pub fn bound_node(task: &Task, infrastructure: &Infrastructure) -> Result<NodeId> {
    match task.bound_node() {
        Some(name) => infrastructure.node_id(name),
        None => Err(Error::InvalidConfiguration(format!(
            "{} task '{}' is not bound to any node",
            task.role(),
            task.name()
        ))),
    }
}

/// Adapts a plain function or closure to [`PlacementPolicy`] for processing tasks.
pub struct PlacementFn<F>(pub F);

impl<F> PlacementPolicy for PlacementFn<F>
where
    F: FnMut(&Task, &Application, &Infrastructure) -> Result<NodeId>,
{
    fn processing_task_placement(
        &mut self,
        task: &Task,
        application: &Application,
        infrastructure: &Infrastructure,
    ) -> Result<NodeId> {
        (self.0)(task, application, infrastructure)
    }
}

/// Binds application tasks to infrastructure nodes according to a placement policy.
pub struct Orchestrator {
    infrastructure: Rc<RefCell<Infrastructure>>,
    policy: Box<dyn PlacementPolicy>,
}

impl Orchestrator {
    /// Creates orchestrator over the infrastructure with specified policy.
    pub fn new(infrastructure: Rc<RefCell<Infrastructure>>, policy: Box<dyn PlacementPolicy>) -> Self {
        Self { infrastructure, policy }
    }

    /// Creates orchestrator placing processing tasks with the given function.
    pub fn with_fn<F>(infrastructure: Rc<RefCell<Infrastructure>>, placement: F) -> Self
    where
        F: FnMut(&Task, &Application, &Infrastructure) -> Result<NodeId> + 'static,
    {
        Self::new(infrastructure, Box::new(PlacementFn(placement)))
    }

    /// Returns the infrastructure managed by the orchestrator.
    pub fn infrastructure(&self) -> Rc<RefCell<Infrastructure>> {
        self.infrastructure.clone()
    }

    /// Places every task of the application and routes its data flows.
    ///
    /// Placing a task allocates its compute units on the selected node, routing a flow between different nodes
    /// reserves its bit rate on every link of the path. Placement is atomic: on any failure all reservations made so
    /// far are released and the application is left unplaced.
    ///
    /// Fails with [`Error::AlreadyPlaced`] if the application is already placed.
    pub fn place(&mut self, application: &mut Application) -> Result<()> {
        if application.is_placed() {
            return Err(Error::AlreadyPlaced(application.name().to_owned()));
        }
        let infrastructure = self.infrastructure.clone();
        let mut infrastructure = infrastructure.borrow_mut();
        let result = self.try_place(application, &mut infrastructure);
        match &result {
            Ok(()) => application.set_placed(true),
            Err(e) => {
                warn!(target: "orchestrator", "Placement of '{}' failed: {}", application.name(), e);
                release(application, &mut infrastructure);
            }
        }
        result
    }

    /// Releases all reservations of a placed application and unbinds its tasks.
    pub fn unplace(&mut self, application: &mut Application) -> Result<()> {
        if !application.is_placed() {
            return Err(Error::NotPlaced(application.name().to_owned()));
        }
        release(application, &mut self.infrastructure.borrow_mut());
        debug!(target: "orchestrator", "Unplaced '{}'", application.name());
        Ok(())
    }

    fn try_place(&mut self, application: &mut Application, infrastructure: &mut Infrastructure) -> Result<()> {
        let order = self.policy.placement_order(application);
        let mut seen = vec![false; application.task_count()];
        for &task_id in &order {
            match seen.get_mut(task_id) {
                Some(true) => {
                    return Err(Error::InvalidConfiguration(format!(
                        "placement order lists task '{}' twice",
                        application.task_by_id(task_id).name()
                    )))
                }
                Some(flag) => *flag = true,
                None => {
                    return Err(Error::InvalidConfiguration(format!(
                        "placement order contains unknown task {}",
                        task_id
                    )))
                }
            }
        }
        if let Some(task_id) = seen.iter().position(|&flag| !flag) {
            return Err(Error::InvalidConfiguration(format!(
                "placement order skipped task '{}'",
                application.task_by_id(task_id).name()
            )));
        }

        for task_id in order {
            let task = application.task_by_id(task_id);
            let node = match task.role() {
                TaskRole::Source => self.policy.source_task_placement(task, application, infrastructure)?,
                TaskRole::Processing => self.policy.processing_task_placement(task, application, infrastructure)?,
                TaskRole::Sink => self.policy.sink_task_placement(task, application, infrastructure)?,
            };
            if node >= infrastructure.node_count() {
                return Err(Error::InvalidConfiguration(format!(
                    "placement policy returned unknown node {} for task '{}'",
                    node,
                    task.name()
                )));
            }
            infrastructure.allocate_cu(node, task.cu())?;
            debug!(
                target: "orchestrator",
                "Placed task '{}' ({} CU) on node '{}'",
                task.name(),
                task.cu(),
                infrastructure.node_by_id(node).name()
            );
            application.bind(task_id, node);
        }

        for flow_id in 0..application.flows().len() {
            let flow = &application.flows()[flow_id];
            let src = application.task_by_id(flow.src()).node();
            let dst = application.task_by_id(flow.dst()).node();
            let (Some(src), Some(dst)) = (src, dst) else {
                continue;
            };
            if src == dst {
                continue;
            }
            let route = infrastructure.route(src, dst)?;
            let bit_rate = flow.bit_rate();
            // a route is stored link by link so that a partial reservation can be released
            let mut reserved = Vec::with_capacity(route.len());
            for link in route {
                if let Err(e) = infrastructure.allocate_bandwidth(link, bit_rate) {
                    application.set_route(flow_id, reserved);
                    return Err(e);
                }
                reserved.push(link);
            }
            application.set_route(flow_id, reserved);
        }
        Ok(())
    }
}

fn release(application: &mut Application, infrastructure: &mut Infrastructure) {
    for task in application.tasks() {
        if let Some(node) = task.node() {
            infrastructure.release_cu(node, task.cu());
        }
    }
    for flow in application.flows() {
        for &link in flow.route() {
            infrastructure.release_bandwidth(link, flow.bit_rate());
        }
    }
    application.reset_placement();
}

/// Process which places an application when it is resumed, e.g. some time after the simulation start.
pub struct PlacementProcess {
    orchestrator: Rc<RefCell<Orchestrator>>,
    application: Rc<RefCell<Application>>,
}

impl PlacementProcess {
    /// Creates placement process.
    pub fn new(orchestrator: Rc<RefCell<Orchestrator>>, application: Rc<RefCell<Application>>) -> Self {
        Self {
            orchestrator,
            application,
        }
    }

    /// Registers the process so that placement happens after `delay`.
    pub fn run(self, scheduler: &mut Scheduler, delay: f64) -> ProcessId {
        let name = format!("placement-{}", self.application.borrow().name());
        scheduler.schedule_process_after(name, Rc::new(RefCell::new(self)), delay)
    }
}

impl Process for PlacementProcess {
    fn resume(&mut self, ctx: &mut SimulationContext) -> std::result::Result<Yield, ProcessError> {
        let mut application = self.application.borrow_mut();
        if let Err(e) = self.orchestrator.borrow_mut().place(&mut application) {
            log_warn!(ctx, "placement of '{}' failed: {}", application.name(), e);
            return Err(e.into());
        }
        log_info!(
            ctx,
            "placed '{}' ({} tasks, {} CU)",
            application.name(),
            application.task_count(),
            application.total_cu()
        );
        Ok(Yield::Finish)
    }
}
