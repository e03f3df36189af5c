mod common;

use approx::assert_relative_eq;
use common::{server_config, with_size, TestHarness};
use qnsim::{
    Arrivals, Distribution, JobClass, Metric, QueueState, SampleLog, Station, StationConfig, WeightedMean,
};

#[test]
fn fcfs_single_server() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(server_config("server", 1, vec![Distribution::deterministic(5.)]));
    let id = station.borrow().id();
    let source = h.scripted(0, id, &[0., 1., 2.]);
    h.run();

    assert_eq!(h.departure_times(), vec![5., 10., 15.]);
    let response: Vec<f64> = h.departures().iter().map(|d| d.response_time).collect();
    assert_eq!(response, vec![5., 9., 13.]);
    assert_eq!(source.borrow().acknowledged(), 3);

    let station = station.borrow();
    assert!(station.ledger().is_empty());
    assert_eq!(station.ledger().counters().jobs_in, 3);
    assert_eq!(station.ledger().counters().jobs_out, 3);
    assert_eq!(station.queue().state(), QueueState::Cool);
    assert_eq!(station.unprocessed_messages(), 0);
    assert_eq!(h.network.borrow().jobs_in_system(), 0);
}

#[test]
fn multi_server_serves_in_parallel() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(server_config("server", 2, vec![Distribution::deterministic(4.)]));
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 0., 0., 1.]);
    h.run();

    assert_eq!(h.departure_times(), vec![4., 4., 8., 8.]);
    assert_eq!(station.borrow().unprocessed_messages(), 0);
}

#[test]
fn tandem_stations() {
    let mut h = TestHarness::single_class();
    let second = h.add_station(server_config("second", 1, vec![Distribution::deterministic(3.)]));
    let first = h.add_station(server_config("first", 1, vec![Distribution::deterministic(1.)]));
    first.borrow_mut().connect(Some(second.borrow().id()));
    let id = first.borrow().id();
    h.scripted(0, id, &[0., 0.]);
    h.run();

    assert_eq!(h.departure_times(), vec![4., 7.]);
    let visits = h.network.borrow().visits(h.departures()[0].job).len();
    assert_eq!(visits, 2);
}

#[test]
fn full_station_drops_arrivals() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(with_size(server_config("server", 1, vec![Distribution::deterministic(5.)]), 1));
    let id = station.borrow().id();
    let source = h.scripted(0, id, &[0., 1., 2.]);
    h.run();

    assert_eq!(h.departure_times(), vec![5.]);
    assert_eq!(source.borrow().acknowledged(), 3);
    assert_eq!(station.borrow().ledger().counters().dropped, 2);
    assert_eq!(h.network.borrow().counters().dropped, 2);
    assert_eq!(h.network.borrow().jobs_in_system(), 0);
}

#[test]
fn station_from_json() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "a"), JobClass::open(1, "b")]);
    let config = StationConfig::from_json(
        r#"{
            "name": "json",
            "queue": {"size": 10, "drop_policies": ["drop", "BAS blocking"]},
            "service": {
                "type": "server",
                "servers": 1,
                "service": [{"type": "deterministic", "value": 2.0}, {"type": "deterministic", "value": 1.0}]
            }
        }"#,
    )
    .unwrap();
    let station = h.add_station(config);
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);
    h.scripted(1, id, &[0.5]);
    h.run();

    let departures = h.departures();
    assert_eq!(departures.len(), 2);
    assert_eq!((departures[0].class, departures[0].time), (0, 2.));
    assert_eq!((departures[1].class, departures[1].time), (1, 3.));
}

#[test]
fn measures_follow_the_ledger() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(server_config("server", 1, vec![Distribution::deterministic(2.)]));
    let residence = WeightedMean::shared();
    let samples = SampleLog::shared();
    station.borrow_mut().analyze(Metric::ResidenceTime, None, residence.clone());
    station.borrow_mut().analyze(Metric::ResidenceTime, Some(0), samples.clone());
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 0.]);
    h.run();

    assert_eq!(samples.borrow().values(), vec![2., 4.]);
    assert_relative_eq!(residence.borrow().mean().unwrap(), 3.);
}

#[test]
fn same_seed_same_trajectory() {
    let run = |seed: u64| {
        let mut h = TestHarness::new_with_seed(seed, vec![JobClass::open(0, "jobs")]);
        let station = h.add_station(server_config("server", 2, vec![Distribution::exponential(1.)]));
        let id = station.borrow().id();
        let interarrival = Distribution::exponential(1.5).sampler().unwrap();
        h.add_source(
            0,
            id,
            Arrivals::Renewal {
                interarrival,
                limit: Some(200),
            },
        );
        h.run();
        h.departure_times()
    };

    let first = run(7);
    assert_eq!(first.len(), 200);
    assert_eq!(first, run(7));
    assert_ne!(first, run(8));
}

#[test]
fn invalid_config_is_rejected() {
    let mut h = TestHarness::single_class();
    let config = server_config("bad", 1, vec![Distribution::deterministic(1.), Distribution::deterministic(1.)]);
    let ctx = h.sim.create_context("bad");
    assert!(Station::new(ctx, h.classes.clone(), h.network.clone(), &config).is_err());
}

#[test]
fn closed_class_circulates() {
    let mut h = TestHarness::new(vec![JobClass::closed(0, "terminals", 2)]);
    let mut config = server_config("server", 1, vec![Distribution::deterministic(1.)]);
    config.preload = vec![2];
    let station = h.add_station(config);
    let id = station.borrow().id();
    station.borrow_mut().connect(Some(id));
    h.run_until(5.5);

    let station = station.borrow();
    assert_eq!(station.ledger().size(), 2);
    assert_eq!(station.ledger().counters().jobs_out, 5);
    assert_eq!(station.output().forwarded(), 5);
    assert_eq!(h.network.borrow().jobs_in_system(), 2);
    assert!(h.departures().is_empty());
}

#[test]
fn drop_is_counted_on_arrival() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(with_size(server_config("server", 1, vec![Distribution::deterministic(10.)]), 1));
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 1.]);

    h.run_until(1.5);
    let counters = station.borrow().ledger().counters().clone();
    assert_eq!(counters.dropped, 1);
    assert_eq!(counters.last_drop_time, 1.);
    assert_eq!(h.network.borrow().counters().dropped, 1);
}
