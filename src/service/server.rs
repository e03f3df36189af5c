//! Single or multi-server service section, optionally preemptive.

use crate::component::Id;
use crate::distribution::Sampler;
use crate::event::EventId;
use crate::job::{Job, JobId};
use crate::message::{NetEvent, NetMessage, Section};
use crate::node::{Node, Outcome};
use crate::{log_debug, log_trace};

#[derive(Clone, Debug)]
struct Slot {
    job: Job,
    started: f64,
    token: EventId,
}

/// Serves up to `servers` jobs in parallel, each for a sampled service time.
///
/// A server slot stays occupied until the output section confirms that the finished job was passed on,
/// which is how blocking propagates upstream.
pub struct Server {
    servers: usize,
    preemptive: bool,
    service: Vec<Sampler>,
    busy: usize,
    in_service: Vec<Slot>,
}

impl Server {
    /// Creates a server with one service distribution per class.
    pub fn new(servers: usize, preemptive: bool, service: Vec<Sampler>) -> Self {
        Self {
            servers,
            preemptive,
            service,
            busy: 0,
            in_service: Vec::new(),
        }
    }

    /// Number of servers.
    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Occupied slots, including finished jobs not yet accepted downstream.
    pub fn busy(&self) -> usize {
        self.busy
    }

    /// Jobs currently being worked on.
    pub fn jobs_in_service(&self) -> impl Iterator<Item = &Job> {
        self.in_service.iter().map(|slot| &slot.job)
    }

    pub(crate) fn process(&mut self, node: &mut Node, src: Id, msg: NetMessage) -> Outcome {
        let own = src == node.id() && msg.source_section == Section::Service;
        match msg.event {
            NetEvent::Job(job) if own => self.complete(node, job),
            NetEvent::Job(job) => self.accept(node, job),
            NetEvent::Ack(_) => self.on_output_ack(node),
            NetEvent::Start | NetEvent::Stop | NetEvent::Renege(_) | NetEvent::JobRelease(_) => Outcome::Processed,
            _ => Outcome::NotProcessed,
        }
    }

    fn complete(&mut self, node: &Node, job: Job) -> Outcome {
        let Some(pos) = self.in_service.iter().position(|slot| slot.job.id() == job.id()) else {
            return Outcome::NotProcessed;
        };
        let mut job = self.in_service.remove(pos).job;
        job.set_in_service(false);
        job.set_service_time(None);
        job.set_serving_event(None);
        log_trace!(node, "job {} completed service", job.id());
        node.forward(Section::Service, NetEvent::Job(job), 0.);
        Outcome::Processed
    }

    fn accept(&mut self, node: &Node, mut job: Job) -> Outcome {
        if self.busy >= self.servers && self.preemptive {
            if !self.preempt(node) {
                // nothing to evict: every slot holds a finished job waiting for the output
                job.set_preempted(job.service_time().is_some());
                node.backward(Section::Service, NetEvent::PreemptedJob(job), 0.);
                return Outcome::Processed;
            }
        }
        if self.busy >= self.servers {
            return Outcome::NotProcessed;
        }

        let now = node.time();
        let class = job.class_id();
        let service_time = match job.service_time() {
            Some(residual) => residual,
            None => node.sample(&self.service[class]),
        };
        job.set_preempted(false);
        job.set_service_time(Some(service_time));
        job.set_service_arrival_time(now);
        job.set_in_service(true);
        let token = node.send_self(Section::Service, NetEvent::Job(job.clone()), service_time);
        job.set_serving_event(Some(token));
        self.in_service.push(Slot {
            job,
            started: now,
            token,
        });
        self.busy += 1;
        if self.busy < self.servers {
            node.backward(Section::Service, NetEvent::Ack(None), 0.);
        }
        Outcome::Processed
    }

    /// Evicts the most recently started job and sends it back to the queue with its residual demand.
    fn preempt(&mut self, node: &Node) -> bool {
        let Some(slot) = self.in_service.pop() else {
            return false;
        };
        let now = node.time();
        let Slot { mut job, started, token } = slot;
        node.cancel(token);
        let residual = (job.service_time().unwrap_or(0.) - (now - started)).max(0.);
        job.set_service_time(Some(residual));
        job.set_preempted(true);
        job.set_in_service(false);
        job.set_serving_event(None);
        log_debug!(node, "job {} preempted with {:.3} left", job.id(), residual);
        node.backward(Section::Service, NetEvent::PreemptedJob(job), 0.);
        self.busy -= 1;
        true
    }

    fn on_output_ack(&mut self, node: &Node) -> Outcome {
        if self.busy == 0 {
            return Outcome::NotProcessed;
        }
        if self.busy == self.servers {
            node.backward(Section::Service, NetEvent::Ack(None), 0.);
        }
        self.busy -= 1;
        Outcome::Processed
    }

    pub(crate) fn resident_jobs(&self) -> usize {
        self.busy
    }

    /// Id of the job the next completion belongs to, if any.
    pub fn next_completion(&self) -> Option<JobId> {
        self.in_service
            .iter()
            .min_by(|a, b| {
                let end_a = a.started + a.job.service_time().unwrap_or(0.);
                let end_b = b.started + b.job.service_time().unwrap_or(0.);
                end_a.total_cmp(&end_b)
            })
            .map(|slot| slot.job.id())
    }
}
