#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use qnsim::{
    class_list, Arrivals, ClassId, Departure, Distribution, Id, ImpatienceConfig, JobClass, NetworkLedger,
    QueueConfig, ServiceConfig, SharedNetworkLedger, Simulation, Sink, Source, Station, StationConfig,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct TestHarness {
    pub sim: Simulation,
    pub classes: Vec<Rc<JobClass>>,
    pub network: SharedNetworkLedger,
    pub sink: Rc<RefCell<Sink>>,
    pub sink_id: Id,
    sources: usize,
}

impl TestHarness {
    pub fn new(classes: Vec<JobClass>) -> Self {
        Self::new_with_seed(42, classes)
    }

    pub fn new_with_seed(seed: u64, classes: Vec<JobClass>) -> Self {
        init_logger();
        let mut sim = Simulation::new(seed);
        let classes = class_list(classes).unwrap();
        let network = NetworkLedger::shared(classes.len());
        let sink = Rc::new(RefCell::new(Sink::new(sim.create_context("sink"), network.clone())));
        let sink_id = sim.add_handler("sink", sink.clone());
        Self {
            sim,
            classes,
            network,
            sink,
            sink_id,
            sources: 0,
        }
    }

    pub fn single_class() -> Self {
        Self::new(vec![JobClass::open(0, "jobs")])
    }

    /// Adds a station routed to the sink and delivers its start message.
    pub fn add_station(&mut self, config: StationConfig) -> Rc<RefCell<Station>> {
        let ctx = self.sim.create_context(&config.name);
        let mut station = Station::new(ctx, self.classes.clone(), self.network.clone(), &config).unwrap();
        station.connect(Some(self.sink_id));
        station.start();
        let station = Rc::new(RefCell::new(station));
        self.sim.add_handler(&config.name, station.clone());
        station
    }

    pub fn add_source(&mut self, class: ClassId, target: Id, arrivals: Arrivals) -> Rc<RefCell<Source>> {
        let name = format!("source-{}", self.sources);
        self.sources += 1;
        let ctx = self.sim.create_context(&name);
        let mut source = Source::new(ctx, self.network.clone(), self.classes[class].clone(), target, arrivals);
        source.start();
        let source = Rc::new(RefCell::new(source));
        self.sim.add_handler(&name, source.clone());
        source
    }

    pub fn scripted(&mut self, class: ClassId, target: Id, times: &[f64]) -> Rc<RefCell<Source>> {
        self.add_source(class, target, Arrivals::Scripted(times.to_vec()))
    }

    pub fn run(&mut self) {
        self.sim.step_until_no_events();
    }

    pub fn run_until(&mut self, time: f64) {
        self.sim.step_until_time(time);
    }

    pub fn departures(&self) -> Vec<Departure> {
        self.sink.borrow().departures().cloned().collect()
    }

    pub fn departure_times(&self) -> Vec<f64> {
        self.sink.borrow().departures().map(|d| d.time).collect()
    }
}

pub fn server_config(name: &str, servers: usize, service: Vec<Distribution>) -> StationConfig {
    StationConfig {
        name: name.to_string(),
        queue: QueueConfig::default(),
        service: ServiceConfig::Server {
            servers,
            preemptive: false,
            service,
        },
        impatience: Vec::new(),
        preload: Vec::new(),
    }
}

pub fn with_size(mut config: StationConfig, size: i64) -> StationConfig {
    config.queue.size = size;
    config
}

pub fn with_impatience(mut config: StationConfig, impatience: Vec<ImpatienceConfig>) -> StationConfig {
    config.impatience = impatience;
    config
}
