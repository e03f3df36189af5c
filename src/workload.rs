//! Components that feed jobs into stations and absorb jobs leaving the network.

use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;

use crate::cast;
use crate::component::Id;
use crate::context::SimulationContext;
use crate::distribution::Sampler;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::job::{ClassId, JobClass, JobId};
use crate::ledger::SharedNetworkLedger;
use crate::message::{NetEvent, NetMessage, Section};
use crate::{log_debug, log_trace};

#[derive(Clone, Serialize)]
struct Generate {}

/// Arrival process of a [`Source`].
pub enum Arrivals {
    /// Jobs arrive at the listed absolute times.
    Scripted(Vec<f64>),
    /// Jobs arrive with independent interarrival times, optionally up to a fixed number of jobs.
    Renewal {
        /// Time between consecutive arrivals.
        interarrival: Sampler,
        /// Number of jobs to generate, unbounded if `None`.
        limit: Option<u64>,
    },
}

/// Generates jobs of one class and sends them to a station.
///
/// The source does not wait for acknowledgements, it only counts them. Jobs rejected by a blocking station stay
/// with the station as waiting requests.
pub struct Source {
    ctx: SimulationContext,
    network: SharedNetworkLedger,
    class: Rc<JobClass>,
    target: Id,
    arrivals: Arrivals,
    generated: u64,
    acknowledged: u64,
}

impl Source {
    /// Creates a source of `class` jobs sent to `target`.
    pub fn new(
        ctx: SimulationContext,
        network: SharedNetworkLedger,
        class: Rc<JobClass>,
        target: Id,
        arrivals: Arrivals,
    ) -> Self {
        Self {
            ctx,
            network,
            class,
            target,
            arrivals,
            generated: 0,
            acknowledged: 0,
        }
    }

    /// Schedules the arrivals.
    pub fn start(&mut self) {
        match &self.arrivals {
            Arrivals::Scripted(times) => {
                let now = self.ctx.time();
                for &t in times {
                    self.ctx.emit_self(Generate {}, (t - now).max(0.));
                }
            }
            Arrivals::Renewal { interarrival, limit } => {
                if *limit != Some(0) {
                    self.ctx.emit_self(Generate {}, interarrival.sample(&self.ctx));
                }
            }
        }
    }

    /// Jobs sent so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Acknowledgements received from the target.
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged
    }

    fn generate(&mut self) {
        let now = self.ctx.time();
        let job = self.network.borrow_mut().create_job(self.class.clone(), now);
        log_debug!(self.ctx, "job {} of class {} arrives", job.id(), self.class.name);
        self.ctx.emit_now(
            NetMessage::new(NetEvent::Job(job), Section::Output, Section::Input),
            self.target,
        );
        self.generated += 1;
        if let Arrivals::Renewal { interarrival, limit } = &self.arrivals {
            if limit.map_or(true, |limit| self.generated < limit) {
                self.ctx.emit_self(Generate {}, interarrival.sample(&self.ctx));
            }
        }
    }
}

impl EventHandler for Source {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Generate {} => {
                self.generate();
            }
            NetMessage { event: net_event, .. } => {
                match net_event {
                    NetEvent::Ack(_) => self.acknowledged += 1,
                    other => log_trace!(self.ctx, "ignored {}", other.name()),
                }
            }
        })
    }
}

/// A job that left the network through a [`Sink`].
#[derive(Clone, Debug, PartialEq)]
pub struct Departure {
    /// Job identifier.
    pub job: JobId,
    /// Class at departure.
    pub class: ClassId,
    /// Departure time.
    pub time: f64,
    /// Time spent in the network.
    pub response_time: f64,
}

/// Absorbs jobs and records their departure in the network ledger.
pub struct Sink {
    ctx: SimulationContext,
    network: SharedNetworkLedger,
    departures: VecDeque<Departure>,
}

impl Sink {
    /// Creates a sink.
    pub fn new(ctx: SimulationContext, network: SharedNetworkLedger) -> Self {
        Self {
            ctx,
            network,
            departures: VecDeque::new(),
        }
    }

    /// Component id of the sink.
    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Departures in the order they happened.
    pub fn departures(&self) -> impl Iterator<Item = &Departure> {
        self.departures.iter()
    }

    /// Number of absorbed jobs.
    pub fn count(&self) -> usize {
        self.departures.len()
    }

    /// Removes and returns the recorded departures.
    pub fn take_departures(&mut self) -> Vec<Departure> {
        self.departures.drain(..).collect()
    }
}

impl EventHandler for Sink {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            NetMessage {
                event: net_event,
                source_section,
                ..
            } => {
                match net_event {
                    NetEvent::Job(job) => {
                        let now = self.ctx.time();
                        self.network.borrow_mut().depart(&job, now);
                        log_debug!(self.ctx, "job {} leaves the network", job.id());
                        self.departures.push_back(Departure {
                            job: job.id(),
                            class: job.class_id(),
                            time: now,
                            response_time: now - job.system_entering_time(),
                        });
                        self.ctx.emit_now(
                            NetMessage::new(NetEvent::Ack(Some(job.id())), Section::Input, source_section),
                            src,
                        );
                    }
                    other => log_trace!(self.ctx, "ignored {}", other.name()),
                }
            }
        })
    }
}
