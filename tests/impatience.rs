mod common;

use common::{server_config, with_impatience, TestHarness};
use qnsim::{BalkingRange, Distribution, DropPolicy, ImpatienceConfig, JobClass, Metric, PutStrategy, SampleLog, TrackedJob};

fn reneging(delay: f64) -> ImpatienceConfig {
    ImpatienceConfig::Reneging {
        delay: Distribution::deterministic(delay),
    }
}

#[test]
fn waiting_job_reneges() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(with_impatience(
        server_config("server", 1, vec![Distribution::deterministic(5.)]),
        vec![reneging(3.)],
    ));
    let reneged = SampleLog::shared();
    station.borrow_mut().analyze(Metric::RenegingRate, None, reneged.clone());
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 1.]);

    h.run_until(2.);
    let second = station.borrow().queue().buffer().first().map(|e| e.job_id());
    let deadline = second.and_then(|job| station.borrow().queue().reneging_deadline(job));
    assert_eq!(deadline, Some(4.));

    h.run();
    assert_eq!(h.departure_times(), vec![5.]);
    assert_eq!(station.borrow().ledger().counters().reneged, 1);
    assert_eq!(h.network.borrow().counters().reneged, 1);
    assert_eq!(reneged.borrow().samples().len(), 1);
    assert_eq!(h.network.borrow().jobs_in_system(), 0);
}

#[test]
fn dispatched_job_keeps_its_place() {
    let mut h = TestHarness::single_class();
    let station = h.add_station(with_impatience(
        server_config("server", 1, vec![Distribution::deterministic(2.)]),
        vec![reneging(3.)],
    ));
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 1.]);
    h.run();

    // the second job starts at 2, before its deadline at 4
    assert_eq!(h.departure_times(), vec![2., 4.]);
    assert_eq!(station.borrow().ledger().counters().reneged, 0);
}

#[test]
fn blocked_request_reneges_and_releases_sender() {
    let mut h = TestHarness::single_class();
    let mut config = with_impatience(
        server_config("server", 1, vec![Distribution::deterministic(10.)]),
        vec![reneging(2.)],
    );
    config.queue.size = 1;
    config.queue.drop_policies = vec![DropPolicy::Block];
    let station = h.add_station(config);
    let id = station.borrow().id();
    let source = h.scripted(0, id, &[0., 1.]);

    h.run_until(2.);
    assert_eq!(source.borrow().acknowledged(), 1);

    h.run_until(4.);
    assert_eq!(source.borrow().acknowledged(), 2);
    assert!(station.borrow().queue().waiting_requests().is_empty());

    h.run();
    assert_eq!(h.departure_times(), vec![10.]);
}

#[test]
fn priority_aware_balking_ignores_lower_priority() {
    let mut h = TestHarness::new(vec![
        JobClass::open(0, "low"),
        JobClass::open(1, "high").with_priority(1),
    ]);
    let balking = ImpatienceConfig::Balking {
        ranges: vec![BalkingRange {
            from: 1,
            to: None,
            probability: 1.,
        }],
    };
    let mut config = with_impatience(
        server_config(
            "server",
            1,
            vec![Distribution::deterministic(5.), Distribution::deterministic(5.)],
        ),
        vec![ImpatienceConfig::None, balking],
    );
    config.queue.put_strategies = vec![PutStrategy::Priority, PutStrategy::Priority];
    let station = h.add_station(config);
    let id = station.borrow().id();
    h.scripted(0, id, &[0., 1., 2.]);
    h.scripted(1, id, &[3.]);
    h.run();

    // only low priority jobs wait when the high priority one arrives
    assert_eq!(station.borrow().ledger().counters().balked, 0);
    let classes: Vec<usize> = h.departures().iter().map(|d| d.class).collect();
    assert_eq!(classes, vec![0, 1, 0, 0]);
}
