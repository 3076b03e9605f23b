//! Simulation facade: builds a scenario, runs it and reports the collected series.

use std::cell::RefCell;
use std::rc::Rc;

use fogsim_core::Scheduler;
use fogsim_power_models::{
    Capacity, CapacityBoundPowerModel, ConstantPowerModel, NodePowerModel, RateBoundPowerModel,
};
use log::{error, info};
use serde::Serialize;
use sugars::{rc, refcell};

use crate::application::{Application, Task, TaskRole};
use crate::config::{NodePowerConfig, ScenarioConfig, TargetSpec};
use crate::error::{EntityKind, Error, Result};
use crate::infrastructure::{Infrastructure, Link, Node};
use crate::orchestrator::{Orchestrator, PlacementPolicy, PlacementProcess};
use crate::placement_algorithms::placement_algorithm_resolver;
use crate::power_meter::{MeterTarget, PowerMeter, PowerSample};

/// Series recorded by a single meter.
#[derive(Clone, Debug, Serialize)]
pub struct MeterReport {
    /// Meter name.
    pub name: String,
    /// Sampling interval.
    pub interval: f64,
    /// `false` if the run was aborted.
    pub complete: bool,
    /// Energy consumed from the first sample to the end of the run.
    pub energy: f64,
    /// Average sampled power.
    pub mean_power: f64,
    /// Recorded samples.
    pub samples: Vec<PowerSample>,
}

/// Compute units allocated on a node at the end of the run.
#[derive(Clone, Debug, Serialize)]
pub struct NodeUsage {
    /// Node name.
    pub name: String,
    /// Allocated compute units.
    pub used_cu: f64,
}

/// Results of a simulation run.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    /// Random seed.
    pub seed: u64,
    /// Simulation horizon.
    pub horizon: f64,
    /// Final simulation time.
    pub time: f64,
    /// Whether the application ended up placed.
    pub placed: bool,
    /// Per-meter series in meter registration order.
    pub meters: Vec<MeterReport>,
    /// Per-node usage in node registration order.
    pub used_cu: Vec<NodeUsage>,
    /// Error which aborted the run, if any.
    pub error: Option<String>,
}

/// Ties together the scheduler, the infrastructure, one application, its orchestrator and the power meters.
pub struct PowerSimulation {
    seed: u64,
    scheduler: Scheduler,
    infrastructure: Rc<RefCell<Infrastructure>>,
    application: Rc<RefCell<Application>>,
    orchestrator: Rc<RefCell<Orchestrator>>,
    meters: Vec<Rc<RefCell<PowerMeter>>>,
    horizon: f64,
    placement_delay: f64,
    started: bool,
    error: Option<String>,
}

impl PowerSimulation {
    /// Creates simulation with horizon 5 and placement at time 0.
    pub fn new(
        seed: u64,
        infrastructure: Infrastructure,
        application: Application,
        policy: Box<dyn PlacementPolicy>,
    ) -> Self {
        let infrastructure = rc!(refcell!(infrastructure));
        let orchestrator = rc!(refcell!(Orchestrator::new(infrastructure.clone(), policy)));
        Self {
            seed,
            scheduler: Scheduler::new(seed),
            infrastructure,
            application: rc!(refcell!(application)),
            orchestrator,
            meters: Vec::new(),
            horizon: 5.,
            placement_delay: 0.,
            started: false,
            error: None,
        }
    }

    /// Builds infrastructure, application, placement policy and meters from the config.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self> {
        let infrastructure = build_infrastructure(config)?;
        let application = build_application(config)?;
        let policy = placement_algorithm_resolver(&config.placement, config.seed)?;
        let mut sim = Self::new(config.seed, infrastructure, application, policy);
        sim.set_horizon(config.horizon);
        sim.set_placement_delay(config.placement_delay);
        for meter_config in &config.meters {
            let mut targets = Vec::with_capacity(meter_config.targets.len());
            for target in &meter_config.targets {
                targets.push(sim.resolve_target(&target.parse()?)?);
            }
            let meter = PowerMeter::new(&meter_config.name, sim.infrastructure.clone(), targets)
                .interval(meter_config.interval.unwrap_or(1.))
                .delay(meter_config.delay.unwrap_or(0.));
            sim.add_meter(meter);
        }
        Ok(sim)
    }

    /// Converts parsed target into a meter target of this simulation.
    pub fn resolve_target(&self, spec: &TargetSpec) -> Result<MeterTarget> {
        let infrastructure = self.infrastructure.borrow();
        match spec {
            TargetSpec::Node(name) => MeterTarget::node(&infrastructure, name),
            TargetSpec::Link(src, dst) => MeterTarget::link(&infrastructure, src, dst),
            TargetSpec::Application => Ok(MeterTarget::Application(self.application.clone())),
            TargetSpec::Infrastructure => Ok(MeterTarget::Infrastructure),
        }
    }

    /// Sets simulation horizon.
    pub fn set_horizon(&mut self, horizon: f64) {
        self.horizon = horizon;
    }

    /// Sets the time at which the application is placed.
    pub fn set_placement_delay(&mut self, delay: f64) {
        self.placement_delay = delay;
    }

    /// Adds meter which is started with the simulation.
    pub fn add_meter(&mut self, meter: PowerMeter) -> Rc<RefCell<PowerMeter>> {
        let meter = rc!(refcell!(meter));
        self.meters.push(meter.clone());
        meter
    }

    /// Places the application after the placement delay and runs all meters up to the horizon.
    ///
    /// Can be called only once. If some process fails, the run is aborted, the error is returned and the recorded
    /// series remain available marked as incomplete.
    pub fn run(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::InvalidConfiguration("simulation has already been run".to_owned()));
        }
        for (name, value) in [("horizon", self.horizon), ("placement delay", self.placement_delay)] {
            if !(value.is_finite() && value >= 0.) {
                return Err(Error::InvalidConfiguration(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        for meter in &self.meters {
            meter.borrow().validate()?;
        }
        self.started = true;
        // placement goes first so that it precedes meter samples taken at the same time
        PlacementProcess::new(self.orchestrator.clone(), self.application.clone())
            .run(&mut self.scheduler, self.placement_delay);
        for meter in &self.meters {
            PowerMeter::run(meter, &mut self.scheduler)?;
        }
        match self.scheduler.run(self.horizon) {
            Ok(()) => {
                info!(
                    target: "simulation",
                    "Finished at {:.3} after {} events",
                    self.scheduler.time(),
                    self.scheduler.event_count()
                );
                Ok(())
            }
            Err(e) => {
                error!(target: "simulation", "Run aborted: {}", e);
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Returns the results collected so far.
    pub fn report(&self) -> SimulationReport {
        let end = self.scheduler.time();
        let meters = self
            .meters
            .iter()
            .map(|meter| {
                let meter = meter.borrow();
                MeterReport {
                    name: meter.name().to_owned(),
                    interval: meter.sampling_interval(),
                    complete: meter.is_complete(),
                    energy: meter.energy_until(end),
                    mean_power: meter.mean_power(),
                    samples: meter.samples().to_vec(),
                }
            })
            .collect();
        let used_cu = self
            .infrastructure
            .borrow()
            .used_cu_snapshot()
            .into_iter()
            .map(|(name, used_cu)| NodeUsage { name, used_cu })
            .collect();
        SimulationReport {
            seed: self.seed,
            horizon: self.horizon,
            time: self.scheduler.time(),
            placed: self.application.borrow().is_placed(),
            meters,
            used_cu,
            error: self.error.clone(),
        }
    }

    /// Returns the scheduler, e.g. to register additional processes before the run.
    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Returns the infrastructure.
    pub fn infrastructure(&self) -> Rc<RefCell<Infrastructure>> {
        self.infrastructure.clone()
    }

    /// Returns the application.
    pub fn application(&self) -> Rc<RefCell<Application>> {
        self.application.clone()
    }

    /// Returns the orchestrator.
    pub fn orchestrator(&self) -> Rc<RefCell<Orchestrator>> {
        self.orchestrator.clone()
    }

    /// Returns all meters in registration order.
    pub fn meters(&self) -> &[Rc<RefCell<PowerMeter>>] {
        &self.meters
    }

    /// Returns meter by its name.
    pub fn meter(&self, name: &str) -> Option<Rc<RefCell<PowerMeter>>> {
        self.meters.iter().find(|m| m.borrow().name() == name).cloned()
    }
}

fn build_infrastructure(config: &ScenarioConfig) -> Result<Infrastructure> {
    let mut infrastructure = Infrastructure::new();
    for node in &config.nodes {
        let power_model: Box<dyn NodePowerModel> = match node.power {
            NodePowerConfig::CapacityBound {
                static_power,
                max_power,
            } => Box::new(CapacityBoundPowerModel::new(static_power, max_power)),
            NodePowerConfig::RateBound { power_per_cu } => Box::new(RateBoundPowerModel::new(power_per_cu)),
            NodePowerConfig::Constant { power } => Box::new(ConstantPowerModel::new(power)),
        };
        infrastructure.add_node(Node::new(&node.name, Capacity::from(node.cu), power_model))?;
    }
    for link in &config.links {
        infrastructure.add_link(Link::per_bit(
            &link.src,
            &link.dst,
            link.latency.unwrap_or(0.),
            Capacity::from(link.bandwidth),
            link.power_per_bit,
        ))?;
    }
    Ok(infrastructure)
}

fn build_application(config: &ScenarioConfig) -> Result<Application> {
    let mut application = Application::new(&config.application);
    for task in &config.tasks {
        let incoming: Vec<(&str, f64)> = config
            .flows
            .iter()
            .filter(|f| f.dst == task.name)
            .map(|f| (f.src.as_str(), f.bit_rate))
            .collect();
        let mut descriptor = Task::new(&task.name, task.role.unwrap_or(TaskRole::Processing), task.cu);
        if let Some(node) = &task.node {
            descriptor = descriptor.bound_to(node);
        }
        application.add_task(descriptor, &incoming)?;
    }
    if let Some(flow) = config.flows.iter().find(|f| application.task_id(&f.dst).is_err()) {
        return Err(Error::not_found(EntityKind::Task, &flow.dst));
    }
    Ok(application)
}
