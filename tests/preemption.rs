mod common;

use common::{server_config, TestHarness};
use qnsim::{ConfigError, Distribution, JobClass, PutStrategy, ServiceConfig, Station, StationConfig, TrackedJob};

fn preemptive_station() -> StationConfig {
    let mut config = server_config("server", 1, Vec::new());
    config.service = ServiceConfig::Server {
        servers: 1,
        preemptive: true,
        service: vec![Distribution::deterministic(5.), Distribution::deterministic(2.)],
    };
    config.queue.put_strategies = vec![PutStrategy::Tail, PutStrategy::LcfsPreemptive];
    config
}

#[test]
fn urgent_job_evicts_and_victim_resumes() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "batch"), JobClass::open(1, "urgent")]);
    let station = h.add_station(preemptive_station());
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);
    h.scripted(1, id, &[1.]);

    h.run_until(2.);
    {
        let station = station.borrow();
        let server = station.service().as_server().unwrap();
        let in_service: Vec<usize> = server.jobs_in_service().map(|j| j.class_id()).collect();
        assert_eq!(in_service, vec![1]);
        let waiting = station.queue().buffer().first().unwrap().job().clone();
        assert!(waiting.is_preempted());
        assert_eq!(waiting.service_time(), Some(4.));
    }

    h.run();
    let departures: Vec<(usize, f64)> = h.departures().iter().map(|d| (d.class, d.time)).collect();
    // 1 unit of the batch job was served before eviction, 4 remain after the urgent one leaves at 3
    assert_eq!(departures, vec![(1, 3.), (0, 7.)]);
    assert_eq!(station.borrow().unprocessed_messages(), 0);
}

#[test]
fn non_preemptive_server_keeps_order() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "batch"), JobClass::open(1, "urgent")]);
    let mut config = preemptive_station();
    config.service = ServiceConfig::Server {
        servers: 1,
        preemptive: false,
        service: vec![Distribution::deterministic(5.), Distribution::deterministic(2.)],
    };
    config.queue.put_strategies = vec![PutStrategy::Tail, PutStrategy::Head];
    let station = h.add_station(config);
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 0.5]);
    h.scripted(1, id, &[1.]);
    h.run();

    let departures: Vec<(usize, f64)> = h.departures().iter().map(|d| (d.class, d.time)).collect();
    assert_eq!(departures, vec![(0, 5.), (1, 7.), (0, 12.)]);
}

#[test]
fn preemptive_put_needs_a_preemptive_server() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "batch"), JobClass::open(1, "urgent")]);
    let mut config = preemptive_station();
    config.service = ServiceConfig::Server {
        servers: 1,
        preemptive: false,
        service: vec![Distribution::deterministic(5.), Distribution::deterministic(2.)],
    };
    let ctx = h.sim.create_context("server");
    let result = Station::new(ctx, h.classes.clone(), h.network.clone(), &config);
    assert!(matches!(result, Err(ConfigError::PreemptionMismatch { class: 1 })));
}
