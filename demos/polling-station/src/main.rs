use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use clap::Parser;
use log::info;

use qnsim::{
    class_list, Arrivals, Distribution, GetStrategyConfig, JobClass, Metric, NetworkLedger, PollingDiscipline,
    QueueConfig, ServiceConfig, Simulation, Sink, Source, Station, StationConfig, WeightedMean,
};

/// Polling station fed by Poisson arrivals of several classes
#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// Number of job classes
    #[clap(long, default_value_t = 3)]
    classes: usize,

    /// Arrival rate of every class
    #[clap(long, default_value_t = 0.2)]
    arrival_rate: f64,

    /// Mean service time
    #[clap(long, default_value_t = 1.0)]
    service_time: f64,

    /// Switchover time between classes
    #[clap(long, default_value_t = 0.5)]
    switchover: f64,

    /// Serve at most this many jobs per visit, exhaustive service if not set
    #[clap(long)]
    limit: Option<usize>,

    /// Simulated time
    #[clap(long, default_value_t = 100000.0)]
    time: f64,

    /// Station configuration in JSON, overrides the service options above
    #[clap(long)]
    config: Option<String>,

    /// Random seed
    #[clap(long, default_value_t = 123)]
    seed: u64,
}

fn station_config(args: &Args) -> StationConfig {
    let discipline = match args.limit {
        Some(k) => PollingDiscipline::Limited { k },
        None => PollingDiscipline::Exhaustive,
    };
    StationConfig {
        name: "poller".to_string(),
        queue: QueueConfig {
            get_strategy: GetStrategyConfig::Polling { discipline },
            ..QueueConfig::default()
        },
        service: ServiceConfig::Polling {
            servers: 1,
            service: vec![Distribution::exponential(1. / args.service_time); args.classes],
            switchover: vec![Distribution::deterministic(args.switchover); args.classes],
        },
        impatience: Vec::new(),
        preload: Vec::new(),
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "{}", record.args())
        })
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {}", path, e));
            StationConfig::from_json(&text).unwrap_or_else(|e| panic!("invalid config {}: {}", path, e))
        }
        None => station_config(&args),
    };

    let mut sim = Simulation::new(args.seed);
    let classes = class_list(
        (0..args.classes)
            .map(|c| JobClass::open(c, &format!("class-{}", c)))
            .collect(),
    )
    .unwrap();
    let network = NetworkLedger::shared(classes.len());
    let response: Vec<_> = (0..classes.len()).map(|_| WeightedMean::shared()).collect();
    for (class, measure) in response.iter().enumerate() {
        network
            .borrow_mut()
            .analyze(Metric::ResponseTime, Some(class), measure.clone());
    }

    let sink = Sink::new(sim.create_context("sink"), network.clone());
    let sink_id = sim.add_handler("sink", Rc::new(RefCell::new(sink)));
    let mut station = Station::new(sim.create_context(&config.name), classes.clone(), network.clone(), &config)
        .unwrap_or_else(|e| panic!("invalid station: {}", e));
    station.connect(Some(sink_id));
    let queue_length = WeightedMean::shared();
    station.analyze(Metric::QueueLength, None, queue_length.clone());
    station.start();
    let station_id = sim.add_handler(&config.name, Rc::new(RefCell::new(station)));

    let interarrival = Distribution::exponential(args.arrival_rate).sampler().unwrap();
    for class in &classes {
        let name = format!("source-{}", class.id);
        let arrivals = Arrivals::Renewal {
            interarrival: interarrival.clone(),
            limit: None,
        };
        let mut source = Source::new(sim.create_context(&name), network.clone(), class.clone(), station_id, arrivals);
        source.start();
        sim.add_handler(&name, Rc::new(RefCell::new(source)));
    }

    let t = Instant::now();
    sim.step_until_time(args.time);
    let elapsed = t.elapsed().as_secs_f64();

    for (class, measure) in response.iter().enumerate() {
        let measure = measure.borrow();
        info!(
            "class {}: {} jobs, mean response time {:.3}",
            class,
            measure.samples(),
            measure.mean().unwrap_or(0.)
        );
    }
    info!("mean number of jobs at the station: {:.3}", queue_length.borrow().mean().unwrap_or(0.));
    info!(
        "processed {} events in {:.2}s ({:.0} events/s)",
        sim.event_count(),
        elapsed,
        sim.event_count() as f64 / elapsed
    );
}
