//! Station component: an admission queue, a service section and an output router behind one event handler.

use std::rc::Rc;

use crate::cast;
use crate::component::Id;
use crate::config::StationConfig;
use crate::context::SimulationContext;
use crate::error::ConfigError;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::job::JobClass;
use crate::ledger::{JobInfoList, Metric, SharedMeasure, SharedNetworkLedger, TrackedJob};
use crate::message::{NetEvent, NetMessage, Section};
use crate::node::{Node, Outcome};
use crate::output::Output;
use crate::queue::Queue;
use crate::region::SharedRegion;
use crate::service::ServiceSection;
use crate::{log_debug, log_error, log_trace};

/// A station of the queueing network.
///
/// Every incoming [`NetMessage`] is routed to the section named by its target. Sections talk to each other and
/// to other stations only through messages, so a job handed from the queue to the server is delivered as a
/// separate event at the same time.
pub struct Station {
    node: Node,
    queue: Queue,
    service: ServiceSection,
    output: Output,
    unprocessed: u64,
}

impl Station {
    /// Builds a station from its configuration.
    ///
    /// Jobs listed in the preload vector of the configuration are created in the network ledger and placed in the
    /// buffer right away.
    pub fn new(
        ctx: SimulationContext,
        classes: Vec<Rc<JobClass>>,
        network: SharedNetworkLedger,
        config: &StationConfig,
    ) -> Result<Self, ConfigError> {
        let (settings, service) = config.build(&classes)?;
        let mut queue = Queue::new(classes.len(), settings);
        queue.set_linked_to_ps(service.is_processor_sharing());
        let mut station = Self {
            node: Node::new(ctx, classes, network),
            queue,
            service,
            output: Output::new(None),
            unprocessed: 0,
        };
        if !config.preload.is_empty() {
            station.preload(&config.preload)?;
        }
        Ok(station)
    }

    /// Component id of the station.
    pub fn id(&self) -> Id {
        self.node.id()
    }

    /// Name of the station.
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Sets the component receiving jobs that leave this station. `None` makes the station a sink.
    pub fn connect(&mut self, destination: Option<Id>) {
        self.output.set_destination(destination);
    }

    /// Makes the station a member of a blocking region. Jobs already present count towards the occupancy.
    pub fn join_region(&mut self, region: SharedRegion) {
        {
            let mut r = region.borrow_mut();
            for info in self.node.ledger().iter() {
                r.increase_occupancy(info.job().class_id());
            }
        }
        self.node.set_region(Some(region));
    }

    /// Places `counts[c]` fresh jobs of every class `c` into the buffer.
    pub fn preload(&mut self, counts: &[usize]) -> Result<(), ConfigError> {
        let classes = self.node.classes().to_vec();
        if counts.len() != classes.len() {
            return Err(ConfigError::ClassCountMismatch {
                what: "preload",
                expected: classes.len(),
                actual: counts.len(),
            });
        }
        let total = self.node.ledger().size() + counts.iter().sum::<usize>();
        if let Some(size) = self.queue.size() {
            if total > size {
                return Err(ConfigError::InvalidPreload(format!(
                    "{} jobs do not fit a station of size {}",
                    total, size
                )));
            }
        }
        let now = self.node.time();
        let jobs = classes
            .iter()
            .zip(counts)
            .flat_map(|(class, &count)| (0..count).map(move |_| class.clone()))
            .map(|class| self.node.network().create_job(class, now))
            .collect::<Vec<_>>();
        log_debug!(self.node, "preloaded {} jobs", jobs.len());
        self.queue.preload(&mut self.node, jobs);
        Ok(())
    }

    /// Delivers the start message to every section.
    pub fn start(&self) {
        for section in [Section::Input, Section::Service, Section::Output] {
            self.node.send_self(section, NetEvent::Start, 0.);
        }
    }

    /// Station-level ledger.
    pub fn ledger(&self) -> &JobInfoList {
        self.node.ledger()
    }

    /// Input section.
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Service section.
    pub fn service(&self) -> &ServiceSection {
        &self.service
    }

    /// Output section.
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Messages no section could handle.
    pub fn unprocessed_messages(&self) -> u64 {
        self.unprocessed
    }

    /// Registers a measure on the station-level ledger.
    pub fn analyze(&mut self, metric: Metric, class: Option<usize>, measure: SharedMeasure) {
        self.node.ledger_mut().analyze(metric, class, measure);
    }

    fn deliver(&mut self, src: Id, msg: NetMessage) {
        let name = msg.event.name();
        let target = msg.target_section;
        log_trace!(self.node, "{} from {} to {:?}", name, src, target);
        let outcome = match target {
            Section::Input => self.queue.process(&mut self.node, &self.service, src, msg),
            Section::Service => self.service.process(&mut self.node, src, msg),
            Section::Output => self.output.process(&mut self.node, src, msg),
        };
        if outcome == Outcome::NotProcessed {
            self.unprocessed += 1;
            log_error!(self.node, "{} from {} was not processed by {:?} section", name, src, target);
        }
    }
}

impl EventHandler for Station {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            NetMessage {
                event: net_event,
                source_section,
                target_section,
            } => {
                self.deliver(src, NetMessage::new(net_event, source_section, target_section));
            }
        })
    }
}
