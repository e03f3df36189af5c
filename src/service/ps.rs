//! Processor-sharing service section.
//!
//! All resident jobs are served at once. Every class gets a service fraction: the share of the total capacity each of
//! its jobs receives. With at most as many jobs as servers every job gets a whole server. Otherwise the
//! capacity is split by the class strategies; a class whose jobs would get more than a whole server is capped at
//! one server per job and the remaining capacity is split again among the other classes.
//!
//! A single wake-up is pending at any time: the earliest completion or patience expiry.

use serde::{Deserialize, Serialize};

use crate::component::Id;
use crate::distribution::Sampler;
use crate::event::EventId;
use crate::job::{ClassId, JobId};
use crate::ledger::{JobInfoList, PsJobInfo, TrackedJob};
use crate::message::{NetEvent, NetMessage, Section};
use crate::node::{Node, Outcome};
use crate::state::EPSILON;
use crate::{log_debug, log_trace};

/// Rule splitting processor-sharing capacity among classes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsStrategy {
    /// Every job gets the same share.
    #[default]
    Eps,
    /// Every job gets a share proportional to its class weight.
    Dps,
    /// Every class gets a share proportional to its weight, split evenly among its jobs.
    Gps,
}

impl PsStrategy {
    /// Share of the residual capacity given to one job of `class`. Shares of all unsaturated jobs add up to one.
    fn slice(self, class: ClassId, occupancy: &[usize], weights: &[f64], saturated: &[bool]) -> f64 {
        let active = || (0..occupancy.len()).filter(|c| !saturated[*c] && occupancy[*c] > 0);
        let share = match self {
            PsStrategy::Eps => {
                let jobs: usize = active().map(|c| occupancy[c]).sum();
                1. / jobs as f64
            }
            PsStrategy::Dps => {
                let total: f64 = active().map(|c| occupancy[c] as f64 * weights[c]).sum();
                weights[class] / total
            }
            PsStrategy::Gps => {
                let total: f64 = active().map(|c| weights[c]).sum();
                weights[class] / total / occupancy[class] as f64
            }
        };
        if share.is_finite() {
            share
        } else {
            0.
        }
    }
}

/// Per-class totals of completed processor-sharing jobs.
#[derive(Clone, Debug, Default)]
pub struct PsStats {
    /// Completed jobs.
    pub completed: u64,
    /// Sum of service demands of completed jobs.
    pub service_time: f64,
    /// Sum of time completed jobs spent beyond their demand.
    pub queue_time: f64,
}

#[derive(Clone, Copy, Debug)]
struct Wakeup {
    token: EventId,
    job: JobId,
}

/// Processor-sharing server.
pub struct PsServer {
    servers: usize,
    service: Vec<Sampler>,
    weights: Vec<f64>,
    strategies: Vec<PsStrategy>,
    jobs: JobInfoList<PsJobInfo>,
    fractions: Vec<f64>,
    wakeup: Option<Wakeup>,
    last_update: f64,
    stats: Vec<PsStats>,
}

impl PsServer {
    /// Creates a server. All per-class vectors must have one entry per class.
    pub fn new(servers: usize, service: Vec<Sampler>, weights: Vec<f64>, strategies: Vec<PsStrategy>) -> Self {
        let classes = service.len();
        let mut jobs = JobInfoList::new(classes);
        jobs.set_servers(servers);
        Self {
            servers,
            service,
            weights,
            strategies,
            jobs,
            fractions: vec![0.; classes],
            wakeup: None,
            last_update: 0.,
            stats: vec![PsStats::default(); classes],
        }
    }

    /// Number of servers.
    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Jobs sharing the server.
    pub fn jobs(&self) -> &JobInfoList<PsJobInfo> {
        &self.jobs
    }

    /// Current service fraction of every class.
    pub fn service_fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// Busy capacity as a share of all servers.
    pub fn utilization(&self) -> f64 {
        (0..self.fractions.len())
            .map(|c| self.jobs.size_of(c) as f64 * self.fractions[c])
            .sum()
    }

    /// Totals of completed jobs of the class.
    pub fn stats_of(&self, class: ClassId) -> Option<&PsStats> {
        self.stats.get(class)
    }

    pub(crate) fn resident_jobs(&self) -> usize {
        self.jobs.size()
    }

    pub(crate) fn process(&mut self, node: &mut Node, src: Id, msg: NetMessage) -> Outcome {
        let own = src == node.id() && msg.source_section == Section::Service;
        match msg.event {
            NetEvent::Job(job) if own => {
                self.wakeup = None;
                self.advance(node);
                self.complete(node, job.id());
                self.reschedule(node);
                Outcome::Processed
            }
            NetEvent::Renege(_) if own => {
                self.wakeup = None;
                self.advance(node);
                self.reschedule(node);
                Outcome::Processed
            }
            NetEvent::Job(job) => {
                self.suspend(node);
                let now = node.time();
                let id = job.id();
                let service_time = node.sample(&self.service[job.class_id()]);
                self.jobs.add(PsJobInfo::new(job, service_time, now), now);
                node.backward(Section::Service, NetEvent::Ack(Some(id)), 0.);
                self.reschedule(node);
                Outcome::Processed
            }
            NetEvent::RenegeNotice { job, remaining } => {
                self.suspend(node);
                if let Some(info) = self.jobs.look_for_mut(job) {
                    info.set_reneging_delay(Some(remaining));
                }
                self.reschedule(node);
                Outcome::Processed
            }
            NetEvent::Ack(_) | NetEvent::Start | NetEvent::Stop | NetEvent::Renege(_) => Outcome::Processed,
            _ => Outcome::NotProcessed,
        }
    }

    /// Cancels the pending wake-up and brings residual demands up to date.
    fn suspend(&mut self, node: &mut Node) {
        if let Some(wakeup) = self.wakeup.take() {
            node.cancel(wakeup.token);
        }
        self.advance(node);
    }

    /// Serves every resident job for the time elapsed since the last update and removes jobs whose patience
    /// ran out before their demand did.
    fn advance(&mut self, node: &mut Node) {
        let now = node.time();
        let elapsed = now - self.last_update;
        self.last_update = now;
        if elapsed > 0. {
            let rate = self.servers as f64;
            for info in self.jobs.iter_mut() {
                let fraction = self.fractions[info.class_id()];
                info.perform_service(elapsed * rate * fraction);
                info.consume_patience(elapsed);
            }
        }
        let expired: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|info| {
                info.reneging_delay().is_some_and(|d| d <= EPSILON) && info.residual_service_time() > EPSILON
            })
            .map(|info| info.job_id())
            .collect();
        for id in expired {
            if let Some(info) = self.jobs.renege_job(id, now) {
                let job = info.into_job();
                node.ledger_mut().renege_job(id, now);
                node.network().renege_job(&job, now);
                node.leave_region(job.class_id());
                log_debug!(node, "job {} reneged during service", id);
                node.backward(Section::Service, NetEvent::JobCompleted(id), 0.);
            }
        }
    }

    fn complete(&mut self, node: &Node, job_id: JobId) {
        let now = node.time();
        let Some(info) = self.jobs.remove(job_id, now) else {
            return;
        };
        let class = info.class_id();
        let queue_time = (now - info.entering_time() - info.service_time()).max(0.);
        if let Some(stats) = self.stats.get_mut(class) {
            stats.completed += 1;
            stats.service_time += info.service_time();
            stats.queue_time += queue_time;
        }
        log_trace!(node, "job {} completed service", job_id);
        node.forward(Section::Service, NetEvent::Job(info.into_job()), 0.);
        node.backward(Section::Service, NetEvent::JobCompleted(job_id), 0.);
    }

    fn update_fractions(&mut self) {
        let classes = self.fractions.len();
        let servers = self.servers as f64;
        let occupancy: Vec<usize> = (0..classes).map(|c| self.jobs.size_of(c)).collect();
        if self.jobs.size() <= self.servers {
            for (fraction, n) in self.fractions.iter_mut().zip(&occupancy) {
                *fraction = if *n > 0 { 1. / servers } else { 0. };
            }
            return;
        }
        let mut saturated = vec![false; classes];
        let mut residual = servers;
        loop {
            for class in 0..classes {
                if saturated[class] {
                    continue;
                }
                self.fractions[class] = if occupancy[class] == 0 {
                    0.
                } else {
                    let slice = self.strategies[class].slice(class, &occupancy, &self.weights, &saturated);
                    slice * residual / servers
                };
            }
            let mut complete = true;
            for class in 0..classes {
                if !saturated[class] && self.fractions[class] > 1. / servers + EPSILON {
                    self.fractions[class] = 1. / servers;
                    residual -= occupancy[class] as f64;
                    saturated[class] = true;
                    complete = false;
                }
            }
            if complete {
                break;
            }
        }
    }

    /// Recomputes the fractions and schedules the earliest completion or patience expiry.
    fn reschedule(&mut self, node: &Node) {
        self.update_fractions();
        let rate = self.servers as f64;
        let mut next: Option<(f64, JobId, bool)> = None;
        for info in self.jobs.iter() {
            let fraction = self.fractions[info.class_id()];
            if fraction <= 0. {
                continue;
            }
            let completion = info.residual_service_time() / (rate * fraction);
            // completion wins a tie with the patience deadline
            let (wait, renege) = match info.reneging_delay() {
                Some(patience) if patience < completion => (patience.max(0.), true),
                _ => (completion, false),
            };
            if next.map_or(true, |(best, _, _)| wait < best) {
                next = Some((wait, info.job_id(), renege));
            }
        }
        if let Some((wait, job_id, renege)) = next {
            let token = if renege {
                node.send_self(Section::Service, NetEvent::Renege(job_id), wait)
            } else {
                let job = self.jobs.look_for(job_id).map(|info| info.job().clone());
                match job {
                    Some(job) => node.send_self(Section::Service, NetEvent::Job(job), wait),
                    None => return,
                }
            };
            self.wakeup = Some(Wakeup { token, job: job_id });
        }
    }

    /// Job whose completion or patience expiry is scheduled next.
    pub fn next_wakeup(&self) -> Option<JobId> {
        self.wakeup.map(|w| w.job)
    }
}
