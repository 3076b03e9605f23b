use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use clap::Parser;
use env_logger::Builder;
use log::info;
use sugars::{rc, refcell};

use fogsim::infrastructure::{Infrastructure, Node};
use fogsim::{
    Application, MeterTarget, Orchestrator, PlacementProcess, PowerMeter, PowerSimulation, ScenarioConfig, Task,
};
use fogsim_core::Scheduler;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Scenario config file, the single node scenario is run if absent
    #[clap(long)]
    config: Option<String>,

    /// Capacity of the node in CU
    #[clap(long, default_value_t = 10.)]
    node_cu: f64,

    /// Power of the idle node in W
    #[clap(long, default_value_t = 10.)]
    static_power: f64,

    /// Power of the fully loaded node in W
    #[clap(long, default_value_t = 30.)]
    max_power: f64,

    /// CU demand of the task
    #[clap(long, default_value_t = 5.)]
    task_cu: f64,

    /// Print the report as JSON
    #[clap(long)]
    json: bool,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

// One node, one task placed at t=2, the node power sampled each time unit up to t=5.
fn single_node(args: &Args) -> Result<Vec<(f64, f64)>, fogsim::Error> {
    let mut infrastructure = Infrastructure::new();
    infrastructure.add_node(Node::capacity_bound("node", args.node_cu, args.static_power, args.max_power))?;
    let infrastructure = rc!(refcell!(infrastructure));

    let mut application = Application::new("app");
    application.add_task(Task::processing("task", args.task_cu), &[])?;
    let orchestrator = Orchestrator::with_fn(infrastructure.clone(), |_, _, infrastructure: &Infrastructure| {
        infrastructure.node_id("node")
    });

    let mut scheduler = Scheduler::new(123);
    PlacementProcess::new(rc!(refcell!(orchestrator)), rc!(refcell!(application))).run(&mut scheduler, 2.);
    let target = MeterTarget::node(&infrastructure.borrow(), "node")?;
    let meter: Rc<RefCell<PowerMeter>> = rc!(refcell!(PowerMeter::new("node", infrastructure.clone(), vec![target])
        .with_callback(|time, power| info!("{}: Node consumes {}W", time, power))));
    PowerMeter::run(&meter, &mut scheduler)?;
    scheduler.run(5.)?;

    let series = meter.borrow().series();
    Ok(series)
}

fn run_config(path: &str, json: bool) -> Result<(), fogsim::Error> {
    let config = ScenarioConfig::from_file(path)?;
    let mut sim = PowerSimulation::from_config(&config)?;
    // a failed run still has partial series worth reporting
    let result = sim.run();
    let report = sim.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    } else {
        for meter in &report.meters {
            println!(
                "{:<12} samples: {:>3}  mean: {:>8.3} W  energy: {:>9.3} J{}",
                meter.name,
                meter.samples.len(),
                meter.mean_power,
                meter.energy,
                if meter.complete { "" } else { "  (incomplete)" }
            );
        }
        for usage in &report.used_cu {
            println!("{:<12} used CU: {}", usage.name, usage.used_cu);
        }
    }
    result
}

fn main() {
    init_logger();
    let args = Args::parse();

    let result = match &args.config {
        Some(path) => run_config(path, args.json),
        None => single_node(&args).map(|series| {
            if args.json {
                println!("{}", serde_json::to_string(&series).unwrap_or_default());
            } else {
                for (time, power) in series {
                    println!("{:>5.1} {:>8.3}", time, power);
                }
            }
        }),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
