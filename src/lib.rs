//! qnsim is a discrete-event engine for the stations of a queueing network. It models what happens to a job from
//! the moment it reaches a station until it is handed to the next one: admission with finite capacity, balking,
//! reneging and retrials, waiting in a buffer, service by a multi-server, processor-sharing or polling server, and
//! routing to the next component.
//!
//! ## Contents
//!
//! - [Basic Concepts](crate#basic-concepts)
//! - [Example](crate#example)
//! - [Stations](crate#stations)
//! - [Admission](crate#admission)
//! - [Statistics](crate#statistics)
//!
//! ## Basic Concepts
//!
//! A simulation model consists of _components_ emitting and processing _events_. Each component is assigned a unique
//! identifier and accesses the simulation through its _context_: the clock, the seeded random number generator, and
//! emitting or cancelling events. The [`Simulation`] processes events in timestamp order, ties broken by emission
//! order, by advancing the clock and invoking the [`EventHandler`] of the destination component.
//!
//! **Job.** A [`Job`] belongs to a [`JobClass`] and travels by value inside messages. At any time exactly one section
//! of one component owns it. Open classes arrive from [`Source`] components and leave through a [`Sink`]. Closed
//! classes are usually preloaded into stations with [`Station::preload`].
//!
//! **Station.** A [`Station`] is a component made of three _sections_: the input [`Queue`], a [`ServiceSection`]
//! and the [`Output`] router. Sections exchange [`NetMessage`]s, both inside the station and with other
//! components, and every job hand-over is acknowledged. A section that receives a job may not accept another one
//! until it has acknowledged the previous sender, which is how back-pressure propagates through the network.
//!
//! **Ledger.** Every station keeps a [`JobInfoList`] of the jobs it currently holds together with the time they
//! arrived. The lists maintain the counters and feed registered measures such as queue length, response time or
//! throughput. The [`NetworkLedger`] does the same for the whole network.
//!
//! ## Example
//!
//! Three jobs arrive at a single-server station at times 0, 1 and 2. Each needs 5 time units of service.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use qnsim::{class_list, Arrivals, Distribution, JobClass, NetworkLedger, QueueConfig, ServiceConfig};
//! use qnsim::{Simulation, Sink, Source, Station, StationConfig};
//!
//! fn main() {
//!     let mut sim = Simulation::new(123);
//!     let classes = class_list(vec![JobClass::open(0, "requests")]).unwrap();
//!     let network = NetworkLedger::shared(classes.len());
//!
//!     let sink = Rc::new(RefCell::new(Sink::new(sim.create_context("sink"), network.clone())));
//!     let sink_id = sim.add_handler("sink", sink.clone());
//!
//!     let config = StationConfig {
//!         name: "server".to_string(),
//!         queue: QueueConfig::default(),
//!         service: ServiceConfig::Server {
//!             servers: 1,
//!             preemptive: false,
//!             service: vec![Distribution::deterministic(5.)],
//!         },
//!         impatience: Vec::new(),
//!         preload: Vec::new(),
//!     };
//!     let ctx = sim.create_context(&config.name);
//!     let mut station = Station::new(ctx, classes.clone(), network.clone(), &config).unwrap();
//!     station.connect(Some(sink_id));
//!     let station_id = sim.add_handler("server", Rc::new(RefCell::new(station)));
//!
//!     let arrivals = Arrivals::Scripted(vec![0., 1., 2.]);
//!     let mut source = Source::new(sim.create_context("source"), network.clone(), classes[0].clone(), station_id, arrivals);
//!     source.start();
//!     sim.add_handler("source", Rc::new(RefCell::new(source)));
//!
//!     sim.step_until_no_events();
//!     let times: Vec<f64> = sink.borrow().departures().map(|d| d.time).collect();
//!     assert_eq!(times, vec![5., 10., 15.]);
//!     assert_eq!(network.borrow().jobs_in_system(), 0);
//! }
//! ```
//!
//! ## Stations
//!
//! Stations are described by a [`StationConfig`], which can also be read from JSON with
//! [`StationConfig::from_json`]. The service section is one of:
//!
//! - [`Server`]: `n` identical servers. With preemption enabled, a job of a preemptive class evicts the most recently
//!   started job, which returns to the buffer and later resumes its residual service time.
//! - [`PsServer`]: processor sharing. The capacity of all servers is divided between the resident jobs according to
//!   an egalitarian, discriminatory or generalized rule per class, and no job ever gets more than one server.
//! - [`PollingServer`]: serves the buffer one class at a time and spends a switchover time moving to the next class.
//!   The number of jobs served per visit is set by the [`PollingDiscipline`] of the queue.
//!
//! ## Admission
//!
//! An arriving job is first offered to its class [`Impatience`]: balking jobs leave right away with a probability
//! depending on the queue length. If the station has room, the job is admitted to the buffer or, when the server is
//! idle, handed to it directly. Otherwise the class [`DropPolicy`] decides: the job is dropped, held as a blocked
//! request without acknowledging the sender, held as a waiting request, or sent to the retrial orbit from which it
//! tries again after a random delay. Jobs of reneging classes abandon the buffer when their patience expires.
//!
//! Stations may also form a [`BlockingRegion`]: jobs entering a member station from outside are redirected to the
//! region entrance, which enforces a shared capacity.
//!
//! ## Statistics
//!
//! Measures implement the [`Measure`] trait and are registered for a [`Metric`] and an optional class with
//! [`Station::analyze`], [`Queue::analyze`] or [`NetworkLedger::analyze`]. [`WeightedMean`] computes time-weighted or
//! plain means, [`InverseMean`] turns interval samples into rates and [`SampleLog`] keeps raw samples.
//!
//! ## Logging
//!
//! Components log through the [`log`](https://docs.rs/log) facade with the component name as the target, so the
//! output of one station can be selected with `RUST_LOG=server=trace`. Messages that no section can handle are
//! logged as errors and counted by [`Station::unprocessed_messages`].

#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod component;
pub mod config;
pub mod context;
pub mod distribution;
pub mod error;
pub mod event;
pub mod handler;
pub mod impatience;
pub mod job;
pub mod ledger;
pub mod log;
pub mod message;
pub mod node;
pub mod output;
pub mod queue;
pub mod region;
pub mod service;
pub mod simulation;
mod state;
pub mod station;
pub mod workload;

pub use colored;
pub use component::Id;
pub use config::{GetStrategyConfig, QueueConfig, ServiceConfig, StationConfig};
pub use context::SimulationContext;
pub use distribution::{Distribution, Sampler};
pub use error::ConfigError;
pub use event::{Event, EventData, EventId};
pub use handler::{EventCancellationPolicy, EventHandler};
pub use impatience::{BalkingRange, Impatience, ImpatienceConfig, ImpatienceType};
pub use job::{class_list, ClassId, ClassKind, Job, JobClass, JobId};
pub use ledger::{
    Counters, InverseMean, JobInfo, JobInfoList, Measure, Metric, NetworkLedger, SampleLog, SharedMeasure,
    SharedNetworkLedger, TrackedJob, WeightedMean,
};
pub use message::{NetEvent, NetMessage, Origin, Section};
pub use node::{Node, Outcome};
pub use output::Output;
pub use queue::{DropPolicy, GetStrategy, PollingDiscipline, PutStrategy, Queue, QueueState};
pub use region::{BlockingRegion, SharedRegion};
pub use service::{PollingServer, PsServer, PsStrategy, Server, ServiceSection};
pub use simulation::Simulation;
pub use state::EPSILON;
pub use station::Station;
pub use workload::{Arrivals, Departure, Sink, Source};
