//! Polling server: visits the classes in cyclic order and pays a switchover time between visits.

use crate::component::Id;
use crate::distribution::Sampler;
use crate::job::{ClassId, Job};
use crate::message::{NetEvent, NetMessage, Section};
use crate::node::{Node, Outcome};
use crate::{log_debug, log_trace};

/// Service section of a polling station.
///
/// The paired queue decides when a visit ends and asks for a switchover with
/// [`NetEvent::PollingServerNext`]; the server answers with the same event once the switchover time has
/// elapsed, or with [`NetEvent::PollingServerReady`] when every class switches at zero cost.
pub struct PollingServer {
    servers: usize,
    service: Vec<Sampler>,
    switchover: Vec<Sampler>,
    busy: usize,
    switch_pending: bool,
    switching: bool,
    class_in_service: ClassId,
}

impl PollingServer {
    /// Creates a server with one service and one switchover distribution per class.
    ///
    /// `switchover[c]` is the time to switch to class `c`.
    pub fn new(servers: usize, service: Vec<Sampler>, switchover: Vec<Sampler>) -> Self {
        Self {
            servers,
            service,
            switchover,
            busy: 0,
            switch_pending: false,
            switching: false,
            class_in_service: 0,
        }
    }

    /// Number of servers.
    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Jobs currently being served.
    pub fn busy(&self) -> usize {
        self.busy
    }

    /// Class the server is visiting or switching to.
    pub fn class_in_service(&self) -> ClassId {
        self.class_in_service
    }

    /// Returns `true` while a switchover is in progress.
    pub fn is_switching(&self) -> bool {
        self.switching
    }

    pub(crate) fn resident_jobs(&self) -> usize {
        self.busy
    }

    pub(crate) fn process(&mut self, node: &mut Node, src: Id, msg: NetMessage) -> Outcome {
        let own = src == node.id() && msg.source_section == Section::Service;
        match msg.event {
            NetEvent::Job(job) if own => self.complete(node, job),
            NetEvent::Job(job) => self.accept(node, job),
            NetEvent::PollingServerNext if own => {
                self.switching = false;
                log_trace!(node, "switchover to class {} done", self.class_in_service);
                node.backward(Section::Service, NetEvent::PollingServerNext, 0.);
                Outcome::Processed
            }
            NetEvent::PollingServerNext => {
                if self.busy == 0 {
                    self.switch_over(node);
                } else {
                    self.switch_pending = true;
                }
                Outcome::Processed
            }
            NetEvent::Ack(_) | NetEvent::Start | NetEvent::Stop => Outcome::Processed,
            _ => Outcome::NotProcessed,
        }
    }

    fn accept(&mut self, node: &Node, mut job: Job) -> Outcome {
        if self.busy >= self.servers {
            return Outcome::NotProcessed;
        }
        let class = job.class_id();
        let service_time = node.sample(&self.service[class]);
        job.set_service_time(Some(service_time));
        job.set_service_arrival_time(node.time());
        job.set_in_service(true);
        self.class_in_service = class;
        self.busy += 1;
        node.send_self(Section::Service, NetEvent::Job(job), service_time);
        if self.busy < self.servers {
            node.backward(Section::Service, NetEvent::Ack(None), 0.);
        }
        Outcome::Processed
    }

    fn complete(&mut self, node: &Node, mut job: Job) -> Outcome {
        job.set_in_service(false);
        job.set_service_time(None);
        node.forward(Section::Service, NetEvent::Job(job), 0.);
        self.busy = self.busy.saturating_sub(1);
        node.backward(Section::Service, NetEvent::Ack(None), 0.);
        if self.switch_pending && self.busy == 0 {
            self.switch_pending = false;
            self.switch_over(node);
        }
        Outcome::Processed
    }

    /// Starts a switchover to the next class reached at a cost.
    ///
    /// Classes reached at zero cost are passed over, the queue already chained through them. If a full cycle finds
    /// only such classes the server reports ready instead.
    fn switch_over(&mut self, node: &Node) {
        let classes = self.switchover.len().max(1);
        let mut walk = (self.class_in_service + 1) % classes;
        let mut steps = 0;
        while self.switchover[walk].is_zero() && steps < classes {
            walk = (walk + 1) % classes;
            steps += 1;
        }
        if self.switchover[walk].is_zero() {
            self.class_in_service = walk;
            log_debug!(node, "no class to switch to, server ready");
            node.backward(Section::Service, NetEvent::PollingServerReady, 0.);
            return;
        }
        self.class_in_service = walk;
        self.switching = true;
        let delay = node.sample(&self.switchover[walk]);
        log_trace!(node, "switching to class {} in {:.3}", walk, delay);
        node.send_self(Section::Service, NetEvent::PollingServerNext, delay);
    }
}
