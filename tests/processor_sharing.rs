mod common;

use approx::assert_relative_eq;
use common::TestHarness;
use qnsim::{
    BlockingRegion, Distribution, ImpatienceConfig, JobClass, PsStrategy, QueueConfig, ServiceConfig, StationConfig,
};

fn ps_station(servers: usize, service: Vec<f64>, weights: Vec<f64>, strategies: Vec<PsStrategy>) -> StationConfig {
    StationConfig {
        name: "ps".to_string(),
        queue: QueueConfig::default(),
        service: ServiceConfig::ProcessorSharing {
            servers,
            service: service.into_iter().map(Distribution::deterministic).collect(),
            weights,
            strategies,
        },
        impatience: Vec::new(),
        preload: Vec::new(),
    }
}

#[test]
fn equal_sharing() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(ps_station(1, vec![2.], Vec::new(), Vec::new()));
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 0.]);

    h.run_until(1.);
    {
        let station = station.borrow();
        let ps = station.service().as_processor_sharing().unwrap();
        assert_eq!(ps.jobs().size(), 2);
        assert_relative_eq!(ps.service_fractions()[0], 0.5);
        assert!(station.queue().buffer().is_empty());
    }

    h.run();
    assert_eq!(h.departure_times(), vec![4., 4.]);
    let station = station.borrow();
    let stats = station.service().as_processor_sharing().unwrap().stats_of(0).unwrap();
    assert_eq!(stats.completed, 2);
    assert_relative_eq!(stats.queue_time, 4.);
}

#[test]
fn discriminatory_sharing_follows_weights() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "heavy"), JobClass::open(1, "light")]);
    let station = h.add_station(ps_station(
        1,
        vec![3., 2.],
        vec![3., 1.],
        vec![PsStrategy::Dps, PsStrategy::Dps],
    ));
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);
    h.scripted(1, id, &[0.]);
    h.run();

    // 3/4 and 1/4 of the server until the heavy class is done at 4, then the light job runs alone
    let departures: Vec<(usize, f64)> = h.departures().iter().map(|d| (d.class, d.time)).collect();
    assert_eq!(departures.len(), 2);
    assert_eq!(departures[0].0, 0);
    assert_relative_eq!(departures[0].1, 4., epsilon = 1e-9);
    assert_eq!(departures[1].0, 1);
    assert_relative_eq!(departures[1].1, 5., epsilon = 1e-9);
}

#[test]
fn no_job_gets_more_than_one_server() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(ps_station(2, vec![3.], Vec::new(), Vec::new()));
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);

    h.run_until(1.);
    assert_relative_eq!(
        station.borrow().service().as_processor_sharing().unwrap().service_fractions()[0],
        0.5
    );
    h.run();
    assert_eq!(h.departure_times(), vec![3.]);
}

#[test]
fn patience_runs_out_during_service() {
    let mut h = TestHarness::single_class();
    let mut config = ps_station(1, vec![4.], Vec::new(), Vec::new());
    config.impatience = vec![ImpatienceConfig::Reneging {
        delay: Distribution::deterministic(1.),
    }];
    let station = h.add_station(config);
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 0.]);
    h.run();

    assert!(h.departures().is_empty());
    assert_eq!(h.network.borrow().counters().reneged, 2);
    assert_eq!(h.network.borrow().jobs_in_system(), 0);
    let station = station.borrow();
    assert!(station.ledger().is_empty());
    assert_eq!(station.unprocessed_messages(), 0);
}

#[test]
fn buffered_job_keeps_its_remaining_patience_in_service() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "patient"), JobClass::open(1, "impatient")]);
    let mut config = ps_station(1, vec![2., 10.], Vec::new(), Vec::new());
    config.queue.max_running = 1;
    config.impatience = vec![
        ImpatienceConfig::None,
        ImpatienceConfig::Reneging {
            delay: Distribution::deterministic(3.),
        },
    ];
    let station = h.add_station(config);
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);
    h.scripted(1, id, &[1.]);

    h.run_until(2.5);
    assert_eq!(station.borrow().service().resident_jobs(), 1);

    h.run();
    // waits 1 unit in the buffer, then the 2 units left of its patience run out in service
    let departures: Vec<(usize, f64)> = h.departures().iter().map(|d| (d.class, d.time)).collect();
    assert_eq!(departures, vec![(0, 2.)]);
    assert_eq!(h.network.borrow().counters().reneged, 1);
    assert_eq!(h.network.borrow().counters().last_renege_time, 4.);
    assert_eq!(h.sim.time(), 4.);
    assert_eq!(station.borrow().unprocessed_messages(), 0);
}

#[test]
fn renege_in_service_leaves_the_region() {
    let mut h = TestHarness::single_class();
    let mut config = ps_station(1, vec![4.], Vec::new(), Vec::new());
    config.impatience = vec![ImpatienceConfig::Reneging {
        delay: Distribution::deterministic(1.),
    }];
    let station = h.add_station(config);
    let id = station.borrow().id();
    let region = BlockingRegion::new("region", id, [id], 1).shared();
    station.borrow_mut().join_region(region.clone());
    h.scripted(0, id, &[0.]);

    h.run_until(0.5);
    assert_eq!(region.borrow().occupancy(), 1);

    h.run();
    assert_eq!(h.network.borrow().counters().reneged, 1);
    assert_eq!(region.borrow().occupancy(), 0);
}

#[test]
fn short_job_leaves_first_then_long_one_runs_alone() {
    let mut h = TestHarness::new(vec![JobClass::open(0, "long"), JobClass::open(1, "short")]);
    let station = h.add_station(ps_station(1, vec![4., 2.], Vec::new(), Vec::new()));
    let id = station.borrow().id();
    h.scripted(0, id, &[0.]);
    h.scripted(1, id, &[0.]);

    h.run_until(1.);
    {
        let station = station.borrow();
        let fractions = station.service().as_processor_sharing().unwrap().service_fractions().to_vec();
        assert_eq!(fractions, vec![0.5, 0.5]);
    }

    h.run();
    let departures: Vec<(usize, f64)> = h.departures().iter().map(|d| (d.class, d.time)).collect();
    assert_eq!(departures, vec![(1, 4.), (0, 6.)]);
}
