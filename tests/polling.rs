mod common;

use common::TestHarness;
use qnsim::{
    Distribution, GetStrategyConfig, JobClass, PollingDiscipline, QueueConfig, QueueState, ServiceConfig,
    StationConfig,
};

fn polling_station(discipline: PollingDiscipline, switchover: f64, preload: Vec<usize>) -> StationConfig {
    StationConfig {
        name: "poller".to_string(),
        queue: QueueConfig {
            get_strategy: GetStrategyConfig::Polling { discipline },
            ..QueueConfig::default()
        },
        service: ServiceConfig::Polling {
            servers: 1,
            service: vec![Distribution::deterministic(1.), Distribution::deterministic(1.)],
            switchover: vec![
                Distribution::deterministic(switchover),
                Distribution::deterministic(switchover),
            ],
        },
        impatience: Vec::new(),
        preload,
    }
}

fn two_classes() -> TestHarness {
    TestHarness::new(vec![JobClass::open(0, "a"), JobClass::open(1, "b")])
}

fn served(h: &TestHarness) -> Vec<(usize, f64)> {
    h.departures().iter().map(|d| (d.class, d.time)).collect()
}

#[test]
fn exhaustive_visit_then_switchover() {
    let mut h = two_classes();
    let station = h.add_station(polling_station(PollingDiscipline::Exhaustive, 2., vec![2, 1]));
    h.run_until(20.);

    // class a is emptied, then 2 units of switchover before class b
    assert_eq!(served(&h), vec![(0, 1.), (0, 2.), (1, 5.)]);
    assert!(station.borrow().ledger().is_empty());
    assert_eq!(station.borrow().unprocessed_messages(), 0);
}

#[test]
fn limited_visit_leaves_work_behind() {
    let mut h = two_classes();
    h.add_station(polling_station(PollingDiscipline::Limited { k: 1 }, 2., vec![2, 1]));
    h.run_until(20.);

    assert_eq!(served(&h), vec![(0, 1.), (1, 4.), (0, 7.)]);
}

#[test]
fn gated_visit_serves_only_jobs_present_at_the_gate() {
    let mut h = two_classes();
    let station = h.add_station(polling_station(PollingDiscipline::Gated, 2., vec![1, 0]));
    let id = station.borrow().id();
    h.scripted(0, id, &[0.5]);
    h.run_until(20.);

    // the job arriving during the visit waits for the next cycle
    assert_eq!(served(&h), vec![(0, 1.), (0, 6.)]);
}

#[test]
fn zero_switchover_server_goes_idle() {
    let mut h = two_classes();
    let station = h.add_station(polling_station(PollingDiscipline::Exhaustive, 0., vec![1, 1]));
    h.run();

    assert_eq!(served(&h), vec![(0, 1.), (1, 2.)]);
    let station = station.borrow();
    assert_eq!(station.queue().state(), QueueState::Cool);
    assert_eq!(station.service().as_polling().unwrap().busy(), 0);
}

#[test]
fn idle_zero_switchover_server_wakes_on_arrival() {
    let mut h = two_classes();
    let station = h.add_station(polling_station(PollingDiscipline::Exhaustive, 0., vec![0, 0]));
    let id = station.borrow().id();
    h.scripted(1, id, &[3.]);
    h.scripted(0, id, &[3.5]);
    h.run();

    assert_eq!(served(&h), vec![(1, 4.), (0, 5.)]);
}

#[test]
fn switch_after_busy_servers_skips_zero_cost_classes() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "a"), JobClass::open(1, "b"), JobClass::open(2, "c")]);
    let config = StationConfig {
        name: "poller".to_string(),
        queue: QueueConfig {
            get_strategy: GetStrategyConfig::Polling {
                discipline: PollingDiscipline::Exhaustive,
            },
            ..QueueConfig::default()
        },
        service: ServiceConfig::Polling {
            servers: 2,
            service: vec![Distribution::deterministic(1.); 3],
            switchover: vec![
                Distribution::deterministic(1.),
                Distribution::Zero,
                Distribution::deterministic(1.),
            ],
        },
        impatience: Vec::new(),
        preload: Vec::new(),
    };
    let station = h.add_station(config);
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);
    h.scripted(2, id, &[0.]);
    h.run_until(10.);

    // the switch to class 2 is requested while class 0 is in service and paid once that job leaves at 1
    assert_eq!(served(&h), vec![(0, 1.), (2, 3.)]);
    assert_eq!(station.borrow().unprocessed_messages(), 0);
}
