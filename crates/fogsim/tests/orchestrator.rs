use std::cell::RefCell;
use std::rc::Rc;

use fogsim::infrastructure::{Infrastructure, Link, Node};
use fogsim::placement_algorithms::{placement_algorithm_resolver, BestFit, FirstFit, RandomFit, WorstFit};
use fogsim::{Application, EntityKind, Error, NodeId, Orchestrator, PlacementPolicy, Task, TaskId};
use fogsim_power_models::Capacity;

fn fog_nodes() -> Rc<RefCell<Infrastructure>> {
    let mut infra = Infrastructure::new();
    infra.add_node(Node::capacity_bound("sensor", 1., 0.5, 1.)).unwrap();
    infra.add_node(Node::capacity_bound("fog1", 10., 10., 30.)).unwrap();
    infra.add_node(Node::capacity_bound("fog2", 6., 8., 20.)).unwrap();
    infra.add_node(Node::rate_bound("cloud", 2.)).unwrap();
    infra
        .add_link(Link::per_bit("sensor", "fog1", 1., Capacity::Finite(100.), 1e-3))
        .unwrap();
    infra
        .add_link(Link::per_bit("sensor", "fog2", 1., Capacity::Finite(100.), 1e-3))
        .unwrap();
    Rc::new(RefCell::new(infra))
}

fn single_task(cu: f64) -> Application {
    let mut app = Application::new("app");
    app.add_task(Task::processing("work", cu), &[]).unwrap();
    app
}

fn placed_on(app: &Application, infra: &Rc<RefCell<Infrastructure>>, task: &str) -> String {
    let node = app.task(task).unwrap().node().unwrap();
    infra.borrow().node_by_id(node).name().to_owned()
}

fn used(infra: &Rc<RefCell<Infrastructure>>) -> Vec<f64> {
    infra.borrow().used_cu_snapshot().into_iter().map(|(_, cu)| cu).collect()
}

#[test]
fn test_capacity_invariant() {
    let infra = fog_nodes();
    let mut orchestrator = Orchestrator::with_fn(infra.clone(), |_task, _app, infra: &Infrastructure| {
        infra.node_id("fog2")
    });
    let mut first = single_task(4.);
    orchestrator.place(&mut first).unwrap();
    let mut second = single_task(2.);
    orchestrator.place(&mut second).unwrap();
    assert_eq!(used(&infra), vec![0., 0., 6., 0.]);

    let mut third = single_task(0.5);
    let result = orchestrator.place(&mut third);
    assert!(matches!(
        result,
        Err(Error::CapacityExceeded { kind: EntityKind::Node, ref name, .. }) if name == "fog2"
    ));
    assert!(!third.is_placed());
    assert_eq!(used(&infra), vec![0., 0., 6., 0.]);
}

#[test]
fn test_exceeding_remaining_capacity() {
    let infra = Rc::new(RefCell::new(Infrastructure::new()));
    infra
        .borrow_mut()
        .add_node(Node::capacity_bound("node", 10., 10., 30.))
        .unwrap();
    let mut orchestrator = Orchestrator::with_fn(infra.clone(), |_task, _app, infra: &Infrastructure| {
        infra.node_id("node")
    });
    orchestrator.place(&mut single_task(5.)).unwrap();

    let mut app = single_task(6.);
    assert!(matches!(orchestrator.place(&mut app), Err(Error::CapacityExceeded { .. })));
    assert_eq!(infra.borrow().node("node").unwrap().used_cu(), 5.);
    assert_eq!(app.task("work").unwrap().node(), None);
}

#[test]
fn test_atomic_placement() {
    let infra = fog_nodes();
    let mut app = Application::new("app");
    app.add_task(Task::source("camera", 0.5, "sensor"), &[]).unwrap();
    app.add_task(Task::processing("detect", 4.), &[("camera", 60.)]).unwrap();
    app.add_task(Task::processing("track", 9.), &[("camera", 60.)]).unwrap();
    // detect goes to fog1, track does not fit anywhere but fog1 which is already loaded
    let mut orchestrator = Orchestrator::with_fn(infra.clone(), |_task, _app, infra: &Infrastructure| {
        infra.node_id("fog1")
    });
    let result = orchestrator.place(&mut app);
    assert!(matches!(result, Err(Error::CapacityExceeded { .. })));
    assert_eq!(used(&infra), vec![0., 0., 0., 0.]);
    assert!(app.tasks().iter().all(|t| t.node().is_none()));
    assert!(!app.is_placed());
}

#[test]
fn test_link_rollback() {
    let infra = fog_nodes();
    let mut app = Application::new("app");
    app.add_task(Task::source("camera", 0., "sensor"), &[]).unwrap();
    app.add_task(Task::processing("a", 2.), &[("camera", 60.)]).unwrap();
    app.add_task(Task::processing("b", 2.), &[("camera", 60.)]).unwrap();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(FirstFit::new()));
    // both flows go over sensor->fog1 which carries only 100
    assert!(matches!(
        orchestrator.place(&mut app),
        Err(Error::CapacityExceeded { kind: EntityKind::Link, .. })
    ));
    let infra_ref = infra.borrow();
    assert!(infra_ref.links().iter().all(|l| l.used_bandwidth() == 0.));
    assert!(infra_ref.nodes().iter().all(|n| n.used_cu() == 0.));
    assert!(app.flows().iter().all(|f| f.route().is_empty()));
}

#[test]
fn test_flow_routing() {
    let infra = fog_nodes();
    let mut app = Application::new("app");
    app.add_task(Task::source("camera", 0.5, "sensor"), &[]).unwrap();
    app.add_task(Task::processing("detect", 8.), &[("camera", 60.)]).unwrap();
    app.add_task(Task::processing("track", 5.), &[("camera", 30.)]).unwrap();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(FirstFit::new()));
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "detect"), "fog1");
    assert_eq!(placed_on(&app, &infra, "track"), "fog2");

    let infra_ref = infra.borrow();
    assert_eq!(infra_ref.link("sensor", "fog1").unwrap().used_bandwidth(), 60.);
    assert_eq!(infra_ref.link("sensor", "fog2").unwrap().used_bandwidth(), 30.);
    drop(infra_ref);

    // there is no link from fog2 to fog1
    let mut app = Application::new("other");
    app.add_task(Task::processing("x", 1.).bound_to("fog2"), &[]).unwrap();
    app.add_task(Task::processing("y", 1.).bound_to("fog1"), &[("x", 1.)]).unwrap();
    assert!(matches!(
        orchestrator.place(&mut app),
        Err(Error::NotFound { kind: EntityKind::Path, .. })
    ));
}

#[test]
fn test_already_placed_and_unplace() {
    let infra = fog_nodes();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(FirstFit::new()));
    let mut app = single_task(3.);
    assert!(matches!(orchestrator.unplace(&mut app), Err(Error::NotPlaced(_))));
    orchestrator.place(&mut app).unwrap();
    assert!(matches!(orchestrator.place(&mut app), Err(Error::AlreadyPlaced(_))));
    assert_eq!(used(&infra), vec![0., 3., 0., 0.]);

    orchestrator.unplace(&mut app).unwrap();
    assert!(!app.is_placed());
    assert_eq!(used(&infra), vec![0., 0., 0., 0.]);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(used(&infra), vec![0., 3., 0., 0.]);
}

/// Places processing tasks on `fog1` in a fixed order.
struct FixedOrder(Vec<TaskId>);

impl PlacementPolicy for FixedOrder {
    fn processing_task_placement(
        &mut self,
        _task: &Task,
        _application: &Application,
        infrastructure: &Infrastructure,
    ) -> fogsim::Result<NodeId> {
        infrastructure.node_id("fog1")
    }

    fn placement_order(&self, _application: &Application) -> Vec<TaskId> {
        self.0.clone()
    }
}

#[test]
fn test_invalid_placement_order() {
    let infra = fog_nodes();
    for order in [vec![0, 0], vec![0, 5], vec![]] {
        let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(FixedOrder(order.clone())));
        let mut app = single_task(3.);
        assert!(
            matches!(orchestrator.place(&mut app), Err(Error::InvalidConfiguration(_))),
            "order {:?}",
            order
        );
        assert!(!app.is_placed());
        assert_eq!(used(&infra), vec![0., 0., 0., 0.]);
    }

    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(FixedOrder(vec![0])));
    let mut app = single_task(3.);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(used(&infra), vec![0., 3., 0., 0.]);
    orchestrator.unplace(&mut app).unwrap();
    assert_eq!(used(&infra), vec![0., 0., 0., 0.]);
}

#[test]
fn test_unbound_source() {
    let infra = fog_nodes();
    let mut app = Application::new("app");
    app.add_task(Task::new("camera", fogsim::TaskRole::Source, 0.), &[]).unwrap();
    let mut orchestrator = Orchestrator::new(infra, Box::new(FirstFit::new()));
    assert!(matches!(
        orchestrator.place(&mut app),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_first_fit() {
    let infra = fog_nodes();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(FirstFit::new()));
    let mut app = single_task(7.);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "work"), "fog1");
    let mut app = single_task(7.);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "work"), "cloud");
}

#[test]
fn test_best_fit() {
    let infra = fog_nodes();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(BestFit::new()));
    let mut app = single_task(5.);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "work"), "fog2");
    let mut app = single_task(1.);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "work"), "sensor");
}

#[test]
fn test_worst_fit() {
    let infra = fog_nodes();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(WorstFit::new()));
    let mut app = single_task(5.);
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "work"), "cloud");
}

#[test]
fn test_pinned_task() {
    let infra = fog_nodes();
    let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(WorstFit::new()));
    let mut app = Application::new("app");
    app.add_task(Task::processing("work", 2.).bound_to("fog2"), &[]).unwrap();
    orchestrator.place(&mut app).unwrap();
    assert_eq!(placed_on(&app, &infra, "work"), "fog2");
}

#[test]
fn test_unplaceable() {
    let mut infra = Infrastructure::new();
    infra.add_node(Node::capacity_bound("fog", 4., 10., 30.)).unwrap();
    let infra = Rc::new(RefCell::new(infra));
    let policies: Vec<Box<dyn PlacementPolicy>> = vec![
        Box::new(FirstFit::new()),
        Box::new(BestFit::new()),
        Box::new(WorstFit::new()),
        Box::new(RandomFit::new(1)),
    ];
    for policy in policies {
        let mut orchestrator = Orchestrator::new(infra.clone(), policy);
        let mut app = single_task(5.);
        assert!(matches!(orchestrator.place(&mut app), Err(Error::Unplaceable(ref task)) if task == "work"));
    }
}

#[test]
fn test_random_fit_is_seeded() {
    let run = |seed: u64| {
        let infra = fog_nodes();
        let mut orchestrator = Orchestrator::new(infra.clone(), Box::new(RandomFit::new(seed)));
        (0..10)
            .map(|_| {
                let mut app = single_task(0.1);
                orchestrator.place(&mut app).unwrap();
                placed_on(&app, &infra, "work")
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn test_resolver() {
    for name in ["FirstFit", " BestFit ", "WorstFit", "Random", "Random[seed=7]", "Random[ seed = 7 ]", "Random[]"] {
        assert!(placement_algorithm_resolver(name, 123).is_ok(), "{}", name);
    }
    for name in ["Random[seed=x]", "NextFit", "Random[seed=7", "Random[seed]", "Random[limit=3]", "FirstFit[seed=1]"] {
        assert!(
            matches!(placement_algorithm_resolver(name, 123), Err(Error::InvalidConfiguration(_))),
            "{}",
            name
        );
    }
}
