//! Periodic sampling of power consumption.

use std::cell::RefCell;
use std::rc::Rc;

use fogsim_core::{log_trace, Process, ProcessError, ProcessId, Scheduler, SimulationContext, Yield};
use fogsim_power_models::PowerMeasurement;
use serde::Serialize;

use crate::application::Application;
use crate::error::{Error, Result};
use crate::infrastructure::{Entity, Infrastructure, LinkId, NodeId};

/// Entity observed by a power meter.
#[derive(Clone)]
pub enum MeterTarget {
    /// Single node.
    Node(NodeId),
    /// Single link.
    Link(LinkId),
    /// Sum of all nodes and links.
    Infrastructure,
    /// Power attributable to the application tasks and flows.
    Application(Rc<RefCell<Application>>),
}

impl MeterTarget {
    /// Resolves node target by node name.
    pub fn node(infrastructure: &Infrastructure, name: &str) -> Result<Self> {
        infrastructure.node_id(name).map(Self::Node)
    }

    /// Resolves link target by link endpoints.
    pub fn link(infrastructure: &Infrastructure, src: &str, dst: &str) -> Result<Self> {
        infrastructure.link_id(src, dst).map(Self::Link)
    }

    fn power(&self, infrastructure: &Infrastructure, time: f64) -> Result<PowerMeasurement> {
        match self {
            Self::Node(id) => infrastructure.entity_power(Entity::Node(*id), time),
            Self::Link(id) => infrastructure.entity_power(Entity::Link(*id), time),
            Self::Infrastructure => infrastructure.power(time),
            Self::Application(app) => app.borrow().power(infrastructure, time),
        }
    }
}

/// Single recorded sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PowerSample {
    /// Sampling time.
    pub time: f64,
    /// Power of all meter targets at this time.
    pub measurement: PowerMeasurement,
}

impl PowerSample {
    /// Returns the total power of the sample.
    pub fn power(&self) -> f64 {
        self.measurement.total()
    }
}

/// Observer invoked with the time and total power of each sample.
pub type PowerCallback = Box<dyn FnMut(f64, f64)>;

/// Records the power of its targets every `interval` time units, starting after `delay`.
///
/// # Examples
///
/// ```rust,ignore
/// let meter = rc!(refcell!(PowerMeter::new("edge", infrastructure.clone(), vec![target]).interval(0.5)));
/// PowerMeter::run(&meter, &mut scheduler)?;
/// scheduler.run(5.)?;
/// let series = meter.borrow().series();
/// ```
pub struct PowerMeter {
    name: String,
    infrastructure: Rc<RefCell<Infrastructure>>,
    targets: Vec<MeterTarget>,
    interval: f64,
    delay: f64,
    samples: Vec<PowerSample>,
    // time of the first sample, wake-ups are computed from it to keep samples on the grid
    origin: Option<f64>,
    callback: Option<PowerCallback>,
    aborted_at: Option<f64>,
}

impl PowerMeter {
    /// Creates meter with interval 1 and no delay.
    pub fn new(name: &str, infrastructure: Rc<RefCell<Infrastructure>>, targets: Vec<MeterTarget>) -> Self {
        Self {
            name: name.to_owned(),
            infrastructure,
            targets,
            interval: 1.,
            delay: 0.,
            samples: Vec::new(),
            origin: None,
            callback: None,
            aborted_at: None,
        }
    }

    /// Sets sampling interval.
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the delay of the first sample.
    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the observer called after each sample.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64, f64) + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Registers the meter as a scheduler process.
    pub fn run(this: &Rc<RefCell<Self>>, scheduler: &mut Scheduler) -> Result<ProcessId> {
        let (name, delay) = {
            let meter = this.borrow();
            meter.validate()?;
            (meter.name.clone(), meter.delay)
        };
        Ok(scheduler.schedule_process_after(name, this.clone(), delay))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "meter '{}' has no targets",
                self.name
            )));
        }
        if !(self.interval.is_finite() && self.interval > 0.) {
            return Err(Error::InvalidConfiguration(format!(
                "meter '{}': interval must be positive, got {}",
                self.name, self.interval
            )));
        }
        if !(self.delay.is_finite() && self.delay >= 0.) {
            return Err(Error::InvalidConfiguration(format!(
                "meter '{}': delay must be non-negative, got {}",
                self.name, self.delay
            )));
        }
        Ok(())
    }

    /// Computes the current power of all targets without recording it.
    pub fn measure(&self, time: f64) -> Result<PowerMeasurement> {
        let infrastructure = self.infrastructure.borrow();
        let mut total = PowerMeasurement::default();
        for target in &self.targets {
            total += target.power(&infrastructure, time)?;
        }
        Ok(total)
    }

    /// Meter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sampling interval.
    pub fn sampling_interval(&self) -> f64 {
        self.interval
    }

    /// Recorded samples in time order.
    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    /// Recorded `(time, total power)` pairs.
    pub fn series(&self) -> Vec<(f64, f64)> {
        self.samples.iter().map(|s| (s.time, s.power())).collect()
    }

    /// Energy consumed between the first and the last sample.
    ///
    /// Each sample holds until the next one, so the last sample contributes nothing.
    pub fn energy(&self) -> f64 {
        match self.samples.last() {
            Some(last) => self.energy_until(last.time),
            None => 0.,
        }
    }

    /// Energy consumed from the first sample up to `end`.
    ///
    /// Each sample holds until the next one, but at most for one interval, and never past `end`.
    pub fn energy_until(&self, end: f64) -> f64 {
        let mut energy = 0.;
        for (i, sample) in self.samples.iter().enumerate() {
            let mut hold_end = (sample.time + self.interval).min(end);
            if let Some(next) = self.samples.get(i + 1) {
                hold_end = hold_end.min(next.time);
            }
            energy += sample.power() * (hold_end - sample.time).max(0.);
        }
        energy
    }

    /// Average power over the recorded samples, 0 if nothing was recorded.
    pub fn mean_power(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.;
        }
        self.samples.iter().map(|s| s.power()).sum::<f64>() / self.samples.len() as f64
    }

    /// Returns `false` if the run was aborted before reaching its horizon.
    pub fn is_complete(&self) -> bool {
        self.aborted_at.is_none()
    }

    /// Time at which the run was aborted, if it was.
    pub fn aborted_at(&self) -> Option<f64> {
        self.aborted_at
    }
}

impl Process for PowerMeter {
    fn resume(&mut self, ctx: &mut SimulationContext) -> std::result::Result<Yield, ProcessError> {
        let time = ctx.time();
        let origin = *self.origin.get_or_insert(time);
        let measurement = self.measure(time)?;
        self.samples.push(PowerSample { time, measurement });
        log_trace!(
            ctx,
            "power {:.3} W (static {:.3} W)",
            measurement.total(),
            measurement.static_power
        );
        if let Some(callback) = self.callback.as_mut() {
            callback(time, measurement.total());
        }
        let next = origin + self.samples.len() as f64 * self.interval;
        Ok(Yield::Timeout((next - time).max(0.)))
    }

    fn on_abort(&mut self, time: f64) {
        self.aborted_at = Some(time);
    }
}
