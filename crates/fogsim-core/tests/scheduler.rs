use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fogsim_core::{Process, ProcessError, ProcessId, Scheduler, SimulationContext, SimulationError, Yield};

type Journal = Rc<RefCell<Vec<(f64, String)>>>;

/// Records its wake-ups into a shared journal and sleeps for a fixed period.
struct Recorder {
    journal: Journal,
    period: f64,
    steps_left: Option<u32>,
    aborted_at: Option<f64>,
}

impl Recorder {
    fn new(journal: Journal, period: f64) -> Self {
        Self {
            journal,
            period,
            steps_left: None,
            aborted_at: None,
        }
    }

    fn limited(journal: Journal, period: f64, steps: u32) -> Self {
        Self {
            steps_left: Some(steps),
            ..Self::new(journal, period)
        }
    }
}

impl Process for Recorder {
    fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
        self.journal.borrow_mut().push((ctx.time(), ctx.name().to_owned()));
        if let Some(left) = self.steps_left.as_mut() {
            *left -= 1;
            if *left == 0 {
                return Ok(Yield::Finish);
            }
        }
        Ok(Yield::Timeout(self.period))
    }

    fn on_abort(&mut self, time: f64) {
        self.aborted_at = Some(time);
    }
}

#[derive(Debug)]
struct Boom;

impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for Boom {}

/// Fails at the specified time.
struct FailAt {
    time: f64,
}

impl Process for FailAt {
    fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
        if ctx.time() >= self.time {
            return Err(Box::new(Boom));
        }
        Ok(Yield::Timeout(self.time - ctx.time()))
    }
}

/// Cancels another process when first resumed.
struct Canceler {
    target: ProcessId,
}

impl Process for Canceler {
    fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
        ctx.cancel(self.target);
        Ok(Yield::Finish)
    }
}

fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

fn names_at(journal: &Journal, time: f64) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter(|(t, _)| *t == time)
        .map(|(_, n)| n.clone())
        .collect()
}

#[test]
fn test_simultaneous_wakeups_are_fifo() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    for name in ["a", "b", "c"] {
        scheduler.schedule_process(name, Rc::new(RefCell::new(Recorder::new(journal.clone(), 1.))));
    }
    scheduler.run(2.).unwrap();
    for t in [0., 1., 2.] {
        assert_eq!(names_at(&journal, t), vec!["a", "b", "c"]);
    }
}

#[test]
fn test_run_includes_horizon_and_discards_rest() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    let id = scheduler.schedule_process("p", Rc::new(RefCell::new(Recorder::new(journal.clone(), 2.))));
    scheduler.run(5.).unwrap();
    let times: Vec<f64> = journal.borrow().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0., 2., 4.]);
    assert_eq!(scheduler.time(), 5.);
    assert!(!scheduler.is_pending(id));
    assert_eq!(scheduler.pending_count(), 0);

    // discarded processes are not resumed by subsequent runs
    scheduler.run(10.).unwrap();
    assert_eq!(journal.borrow().len(), 3);
}

#[test]
fn test_phase_and_cardinality() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    scheduler.schedule_process_after("p", Rc::new(RefCell::new(Recorder::new(journal.clone(), 3.))), 1.);
    scheduler.run(10.).unwrap();
    let times: Vec<f64> = journal.borrow().iter().map(|(t, _)| *t).collect();
    // floor((10 - 1) / 3) + 1 = 4
    assert_eq!(times, vec![1., 4., 7., 10.]);
}

#[test]
fn test_wakeup_rounding_past_horizon() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    let near = 30. + 30. * f64::EPSILON;
    scheduler.schedule_process_after("near", Rc::new(RefCell::new(Recorder::new(journal.clone(), 100.))), near);
    scheduler.schedule_process_after("far", Rc::new(RefCell::new(Recorder::new(journal.clone(), 100.))), 30.001);
    scheduler.run(30.).unwrap();
    assert_eq!(*journal.borrow(), vec![(30., "near".to_owned())]);
    assert_eq!(scheduler.time(), 30.);
}

#[test]
fn test_finished_process_is_not_resumed() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    scheduler.schedule_process("p", Rc::new(RefCell::new(Recorder::limited(journal.clone(), 1., 2))));
    scheduler.run(10.).unwrap();
    assert_eq!(journal.borrow().len(), 2);
    assert_eq!(scheduler.event_count(), 2);
}

#[test]
fn test_failure_aborts_run() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    let recorder = Rc::new(RefCell::new(Recorder::new(journal.clone(), 1.)));
    scheduler.schedule_process("recorder", recorder.clone());
    scheduler.schedule_process("faulty", Rc::new(RefCell::new(FailAt { time: 2. })));
    let err = scheduler.run(5.).unwrap_err();

    assert_eq!(err.process(), "faulty");
    assert_eq!(err.time(), 2.);
    assert!(matches!(err, SimulationError::ProcessFailed { process_id: 1, .. }));
    assert!(err.to_string().contains("boom"));
    // the faulty wake-up at 2 was enqueued before the recorder's one, so the recorder never reached 2
    let times: Vec<f64> = journal.borrow().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0., 1.]);
    assert_eq!(recorder.borrow().aborted_at, Some(2.));
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn test_negative_delay_is_fatal() {
    struct Backwards;
    impl Process for Backwards {
        fn resume(&mut self, _ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
            Ok(Yield::Timeout(-1.))
        }
    }

    let mut scheduler = Scheduler::new(123);
    scheduler.schedule_process("backwards", Rc::new(RefCell::new(Backwards)));
    let err = scheduler.run(1.).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidDelay { delay, .. } if delay == -1.));
}

#[test]
fn test_cancel_before_resume() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    let a = scheduler.schedule_process("a", Rc::new(RefCell::new(Recorder::new(journal.clone(), 1.))));
    scheduler.schedule_process("b", Rc::new(RefCell::new(Recorder::new(journal.clone(), 1.))));
    assert!(scheduler.is_pending(a));
    scheduler.cancel(a);
    assert!(!scheduler.is_pending(a));
    scheduler.run(1.).unwrap();
    assert_eq!(names_at(&journal, 0.), vec!["b"]);
    assert_eq!(names_at(&journal, 1.), vec!["b"]);
}

#[test]
fn test_cancel_from_other_process() {
    let journal = journal();
    let mut scheduler = Scheduler::new(123);
    let victim = Rc::new(RefCell::new(Recorder::new(journal.clone(), 1.)));
    let victim = scheduler.schedule_process_after("victim", victim, 1.);
    scheduler.schedule_process("canceler", Rc::new(RefCell::new(Canceler { target: victim })));
    scheduler.run(5.).unwrap();
    assert!(journal.borrow().is_empty());
}

#[test]
fn test_seeded_randomness_is_reproducible() {
    struct Sampler {
        values: Vec<f64>,
    }
    impl Process for Sampler {
        fn resume(&mut self, ctx: &mut SimulationContext) -> Result<Yield, ProcessError> {
            self.values.push(ctx.rand());
            let delay: f64 = ctx.gen_range(0.5..1.5);
            Ok(Yield::Timeout(delay))
        }
    }

    let run = |seed: u64| {
        let mut scheduler = Scheduler::new(seed);
        let sampler = Rc::new(RefCell::new(Sampler { values: Vec::new() }));
        scheduler.schedule_process("sampler", sampler.clone());
        scheduler.run(20.).unwrap();
        let values = sampler.borrow().values.clone();
        values
    };
    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}
