//! State shared by the sections of a station and the plumbing they use to talk.

use std::cell::RefMut;
use std::rc::Rc;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::distribution::Sampler;
use crate::event::EventId;
use crate::job::{ClassId, JobClass, JobId};
use crate::ledger::{JobInfoList, NetworkLedger, SharedNetworkLedger};
use crate::message::{NetEvent, NetMessage, Origin, Section};
use crate::region::SharedRegion;

/// Result of handing a message to a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The message was consumed.
    Processed,
    /// The section cannot handle the message in its current state.
    NotProcessed,
}

/// Context of a station as seen by its sections.
///
/// Holds the station-level ledger (every job between arrival and departure, orbit excluded) and the
/// simulation context used to exchange messages.
pub struct Node {
    ctx: SimulationContext,
    ledger: JobInfoList,
    network: SharedNetworkLedger,
    classes: Vec<Rc<JobClass>>,
    region: Option<SharedRegion>,
}

impl Node {
    /// Creates the node of a station.
    pub fn new(ctx: SimulationContext, classes: Vec<Rc<JobClass>>, network: SharedNetworkLedger) -> Self {
        Self {
            ledger: JobInfoList::new(classes.len()),
            ctx,
            network,
            classes,
            region: None,
        }
    }

    /// Component id of the station.
    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Name of the station.
    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.ctx.time()
    }

    /// Simulation context of the station.
    pub fn ctx(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Station-level ledger.
    pub fn ledger(&self) -> &JobInfoList {
        &self.ledger
    }

    /// Mutable station-level ledger.
    pub fn ledger_mut(&mut self) -> &mut JobInfoList {
        &mut self.ledger
    }

    /// Network-wide ledger.
    pub fn network(&self) -> RefMut<'_, NetworkLedger> {
        self.network.borrow_mut()
    }

    /// Job classes of the network.
    pub fn classes(&self) -> &[Rc<JobClass>] {
        &self.classes
    }

    /// Number of job classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Class by index.
    pub fn class(&self, id: ClassId) -> Option<&Rc<JobClass>> {
        self.classes.get(id)
    }

    /// Blocking region the station belongs to.
    pub fn region(&self) -> Option<&SharedRegion> {
        self.region.as_ref()
    }

    /// Counts a job of the class as gone from the blocking region, if the station belongs to one.
    pub fn leave_region(&self, class: ClassId) {
        if let Some(region) = &self.region {
            region.borrow_mut().decrease_occupancy(class);
        }
    }

    pub(crate) fn set_region(&mut self, region: Option<SharedRegion>) {
        self.region = region;
    }

    /// Draws a value from the sampler using the simulation-wide generator.
    pub fn sample(&self, sampler: &Sampler) -> f64 {
        sampler.sample(&self.ctx)
    }

    /// Sends a message between two sections of this station.
    pub fn send(&self, from: Section, to: Section, event: NetEvent, delay: f64) -> EventId {
        self.ctx.emit_self(NetMessage::new(event, from, to), delay)
    }

    /// Sends a message to a section of another component.
    pub fn send_to(&self, from: Section, dst: Origin, event: NetEvent, delay: f64) -> EventId {
        self.ctx.emit(NetMessage::new(event, from, dst.section), dst.node, delay)
    }

    /// Sends a message to the next section of this station.
    pub fn forward(&self, from: Section, event: NetEvent, delay: f64) -> EventId {
        self.send(from, from.next().unwrap_or(from), event, delay)
    }

    /// Sends a message to the previous section of this station.
    pub fn backward(&self, from: Section, event: NetEvent, delay: f64) -> EventId {
        self.send(from, from.previous().unwrap_or(from), event, delay)
    }

    /// Sends a message from `section` to itself.
    pub fn send_self(&self, section: Section, event: NetEvent, delay: f64) -> EventId {
        self.send(section, section, event, delay)
    }

    /// Acknowledges the sender of a job.
    pub fn acknowledge(&self, from: Section, to: Origin, job: Option<JobId>) -> EventId {
        self.send_to(from, to, NetEvent::Ack(job), 0.)
    }

    /// Cancels a pending message.
    pub fn cancel(&self, event: EventId) {
        self.ctx.cancel_event(event);
    }
}
