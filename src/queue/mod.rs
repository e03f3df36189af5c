//! Admission queue: the input section of a station.
//!
//! The queue decides whether an arriving job balks, is admitted to the buffer, goes straight to the server,
//! waits as a pending request, enters the retrial orbit or is dropped. It then feeds the service section one job
//! at a time, driven by acknowledgements coming back from it.
//!
//! The queue is in one of three states:
//!
//! - [`QueueState::Cool`]: the server can take a job immediately, so the next admitted job is forwarded at once.
//! - [`QueueState::Warm`]: the server is working, jobs wait in the buffer until an acknowledgement arrives.
//! - [`QueueState::Switching`]: a polling server was asked to move to the next class and nothing is dispatched
//!   until it reports back.

mod get;
mod strategy;

use rustc_hash::FxHashMap;

pub use get::{GetStrategy, PollingDiscipline, PollingGetStrategy};
pub use strategy::{DropPolicy, PutStrategy};

use crate::component::Id;
use crate::event::EventId;
use crate::impatience::Impatience;
use crate::job::{Job, JobId};
use crate::ledger::{JobInfo, JobInfoList, Metric, SharedMeasure, TrackedJob, WaitingRequest};
use crate::message::{NetEvent, NetMessage, Origin, Section};
use crate::node::{Node, Outcome};
use crate::service::ServiceSection;
use crate::{log_debug, log_trace};

/// Dispatch state of the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueState {
    /// The server can take a job right away.
    Cool,
    /// The server is busy, jobs are dispatched on acknowledgement.
    Warm,
    /// A polling switchover was requested.
    Switching,
}

#[derive(Clone, Copy, Debug)]
struct RenegingTimer {
    deadline: f64,
    token: EventId,
}

/// Parameters of a queue.
pub struct QueueSettings {
    /// Station capacity including jobs in service, `None` for infinite.
    pub size: Option<usize>,
    /// Cap on jobs in the service section, `None` for unbounded.
    pub max_running: Option<usize>,
    /// Full-buffer policy of every class.
    pub drop_policies: Vec<DropPolicy>,
    /// Buffer insertion rule of every class.
    pub put_strategies: Vec<PutStrategy>,
    /// Impatience of every class.
    pub impatience: Vec<Impatience>,
    /// Rule selecting the next job to serve.
    pub get_strategy: GetStrategy,
}

/// Input section of a station.
pub struct Queue {
    size: Option<usize>,
    max_running: Option<usize>,
    drop_policies: Vec<DropPolicy>,
    put_strategies: Vec<PutStrategy>,
    impatience: Vec<Impatience>,
    get_strategy: GetStrategy,
    buffer: JobInfoList,
    waiting_requests: JobInfoList<WaitingRequest>,
    state: QueueState,
    linked_to_ps: bool,
    reneging: FxHashMap<JobId, RenegingTimer>,
}

impl Queue {
    /// Creates an empty queue for the given number of classes.
    pub fn new(classes: usize, settings: QueueSettings) -> Self {
        Self {
            size: settings.size,
            max_running: settings.max_running,
            drop_policies: settings.drop_policies,
            put_strategies: settings.put_strategies,
            impatience: settings.impatience,
            get_strategy: settings.get_strategy,
            buffer: JobInfoList::new(classes),
            waiting_requests: JobInfoList::new(classes),
            state: QueueState::Cool,
            linked_to_ps: false,
            reneging: FxHashMap::default(),
        }
    }

    pub(crate) fn set_linked_to_ps(&mut self, linked: bool) {
        self.linked_to_ps = linked;
    }

    /// Current dispatch state.
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Station capacity, `None` for infinite.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Buffered jobs in service order.
    pub fn buffer(&self) -> &JobInfoList {
        &self.buffer
    }

    /// Admission attempts parked while the station is full.
    pub fn waiting_requests(&self) -> &JobInfoList<WaitingRequest> {
        &self.waiting_requests
    }

    /// Buffer selection rule.
    pub fn get_strategy(&self) -> &GetStrategy {
        &self.get_strategy
    }

    /// Patience deadline of a waiting job, if it is armed.
    pub fn reneging_deadline(&self, job_id: JobId) -> Option<f64> {
        self.reneging.get(&job_id).map(|t| t.deadline)
    }

    /// Registers a measure on the buffer ledger.
    pub fn analyze(&mut self, metric: Metric, class: Option<usize>, measure: SharedMeasure) {
        self.buffer.analyze(metric, class, measure);
    }

    /// Puts jobs into the buffer before the simulation starts.
    pub fn preload(&mut self, node: &mut Node, jobs: Vec<Job>) {
        let now = node.time();
        for job in jobs {
            node.ledger_mut().add(JobInfo::new(job.clone(), now), now);
            node.network().record_visit(&job, node.id(), now);
            if let Some(region) = node.region() {
                region.borrow_mut().increase_occupancy(job.class_id());
            }
            self.buffer.add(JobInfo::new(job, now), now);
        }
    }

    /// Handles a message addressed to the input section.
    pub fn process(&mut self, node: &mut Node, service: &ServiceSection, src: Id, msg: NetMessage) -> Outcome {
        let origin = Origin {
            node: src,
            section: msg.source_section,
        };
        let from_own_service = src == node.id() && msg.source_section == Section::Service;
        match msg.event {
            NetEvent::Start => self.on_start(node, service),
            NetEvent::Job(job) => self.on_job(node, service, job, origin),
            NetEvent::Retrial(job) => self.on_retrial(node, job),
            NetEvent::RetrialJob(job) => self.on_retrial_job(node, service, job),
            NetEvent::Ack(_) if from_own_service => {
                self.drain_waiting_request(node);
                self.serve_next(node, service);
                Outcome::Processed
            }
            // acknowledgement of a job this queue redirected to a region entrance
            NetEvent::Ack(_) => Outcome::Processed,
            NetEvent::JobCompleted(_) => {
                self.serve_next(node, service);
                Outcome::Processed
            }
            NetEvent::PollingServerReady => {
                self.state = QueueState::Cool;
                Outcome::Processed
            }
            NetEvent::PollingServerNext => {
                self.state = QueueState::Warm;
                self.drain_waiting_request(node);
                self.serve_next(node, service);
                Outcome::Processed
            }
            NetEvent::PreemptedJob(job) => {
                self.put(node, job);
                Outcome::Processed
            }
            NetEvent::Renege(job_id) => self.on_renege(node, job_id),
            NetEvent::JobRelease(_) if src == node.id() => {
                // a job left the station, a parked admission attempt may fit now
                self.drain_waiting_request(node);
                if self.state == QueueState::Cool {
                    self.serve_next(node, service);
                }
                Outcome::Processed
            }
            NetEvent::Stop | NetEvent::JobRelease(_) | NetEvent::JobFinish(_) | NetEvent::Join(_) => Outcome::Processed,
            NetEvent::RenegeNotice { .. } => Outcome::NotProcessed,
        }
    }

    fn on_start(&mut self, node: &Node, service: &ServiceSection) -> Outcome {
        if !self.buffer.is_empty() {
            self.serve_next(node, service);
        }
        Outcome::Processed
    }

    fn on_job(&mut self, node: &mut Node, service: &ServiceSection, mut job: Job, origin: Origin) -> Outcome {
        let now = node.time();
        node.ledger_mut().add(JobInfo::new(job.clone(), now), now);
        node.network().record_visit(&job, node.id(), now);

        let entrance = node
            .region()
            .filter(|r| r.borrow().should_redirect(origin.node))
            .map(|r| r.borrow().input_station());
        if let Some(entrance) = entrance {
            node.ledger_mut().redirect_job(job.id(), now);
            // counted here, the entrance sees a member as the sender
            if let Some(region) = node.region() {
                region.borrow_mut().increase_occupancy(job.class_id());
            }
            log_debug!(node, "job {} redirected to region entrance {}", job.id(), entrance);
            let id = job.id();
            job.set_original_destination(Some(node.id()));
            let dst = Origin {
                node: entrance,
                section: Section::Input,
            };
            node.send_to(Section::Input, dst, NetEvent::Job(job), 0.);
            node.acknowledge(Section::Input, origin, Some(id));
            return Outcome::Processed;
        }

        let entering_region = node.region().is_some_and(|r| !r.borrow().contains(origin.node));
        if entering_region {
            if let Some(region) = node.region() {
                region.borrow_mut().increase_occupancy(job.class_id());
            }
        }
        self.try_admit(node, service, job, Some(origin));
        Outcome::Processed
    }

    fn on_retrial(&mut self, node: &mut Node, job: Job) -> Outcome {
        let now = node.time();
        node.ledger_mut().park(job.id(), now);
        node.ledger_mut().add_to_retrial_orbit(&job, now);
        let delay = self.impatience[job.class_id()].generate_delay(node.ctx()).unwrap_or(0.);
        log_debug!(node, "job {} enters retrial orbit, next attempt in {:.3}", job.id(), delay);
        node.send_self(Section::Input, NetEvent::RetrialJob(job), delay);
        Outcome::Processed
    }

    fn on_retrial_job(&mut self, node: &mut Node, service: &ServiceSection, job: Job) -> Outcome {
        let now = node.time();
        node.ledger_mut().retry_job(JobInfo::new(job.clone(), now), now);
        node.network().retry_job(&job, now);
        self.try_admit(node, service, job, None);
        Outcome::Processed
    }

    fn on_renege(&mut self, node: &mut Node, job_id: JobId) -> Outcome {
        let now = node.time();
        self.reneging.remove(&job_id);
        let (job, blocked_origin) = if let Some(info) = self.buffer.renege_job(job_id, now) {
            (info.into_job(), None)
        } else if let Some(request) = self.waiting_requests.renege_job(job_id, now) {
            let (info, origin) = request.into_parts();
            let job = info.into_job();
            let held = self.drop_policies[job.class_id()] == DropPolicy::Block && origin.node != node.id();
            (job, held.then_some(origin))
        } else {
            log_trace!(node, "stale reneging deadline for job {}", job_id);
            return Outcome::Processed;
        };
        node.ledger_mut().renege_job(job_id, now);
        node.network().renege_job(&job, now);
        node.leave_region(job.class_id());
        if let Some(origin) = blocked_origin {
            node.acknowledge(Section::Input, origin, Some(job_id));
        }
        log_debug!(node, "job {} reneged", job_id);
        Outcome::Processed
    }

    /// Admission of a job already recorded in the station ledger. `origin` is `None` for retrial attempts,
    /// whose sender was acknowledged on the first attempt.
    fn try_admit(&mut self, node: &mut Node, service: &ServiceSection, job: Job, origin: Option<Origin>) {
        let now = node.time();
        let class = job.class_id();

        if self.will_balk(node, &job) {
            node.ledger_mut().balk_job(job.id(), now);
            node.network().balk_job(&job, now);
            node.leave_region(class);
            log_debug!(node, "job {} balked", job.id());
            if let Some(origin) = origin {
                node.acknowledge(Section::Input, origin, Some(job.id()));
            }
            return;
        }

        if self.has_capacity(node) {
            let id = job.id();
            let entered = node
                .ledger_mut()
                .remove_from_retrial_orbit(id, now)
                .and_then(|times| times.first().copied())
                .unwrap_or(job.system_entering_time());
            node.ledger_mut().update_waiting_time(class, now - entered);
            self.admit(node, service, job);
            if let Some(origin) = origin {
                node.acknowledge(Section::Input, origin, Some(id));
            }
        } else {
            self.reject(node, job, origin);
        }
    }

    fn admit(&mut self, node: &Node, service: &ServiceSection, job: Job) {
        let now = node.time();
        if self.put_strategies[job.class_id()].is_preemptive() {
            node.forward(Section::Input, NetEvent::Job(job), 0.);
            return;
        }
        if self.state == QueueState::Cool && self.service_has_capacity(service) {
            self.state = QueueState::Warm;
            if self.buffer.is_empty() && !self.get_strategy.is_polling() {
                self.buffer.add(JobInfo::new(job, now), now);
                if let Some(info) = self.buffer.remove_first(now) {
                    self.dispatch(node, info);
                }
            } else {
                self.put(node, job);
                self.serve_next(node, service);
            }
        } else {
            self.put(node, job);
        }
    }

    fn reject(&mut self, node: &mut Node, job: Job, origin: Option<Origin>) {
        let now = node.time();
        let id = job.id();
        let class = job.class_id();
        let policy = self.drop_policies[class];
        let own = Origin {
            node: node.id(),
            section: Section::Input,
        };

        if let Some(origin) = origin.filter(|o| o.node == node.id() && policy != DropPolicy::Retrial) {
            // a job routed back to its own station must not stall the station's router
            node.acknowledge(Section::Input, origin, Some(id));
            self.waiting_requests.add(WaitingRequest::new(job, origin, now), now);
            self.arm_reneging(node, id, class);
            return;
        }

        match policy {
            DropPolicy::Drop => {
                log_debug!(node, "job {} dropped", id);
                node.ledger_mut().drop_job(id, now);
                node.network().drop_job(&job, now);
                node.leave_region(class);
                if let Some(origin) = origin {
                    node.acknowledge(Section::Input, origin, Some(id));
                }
            }
            DropPolicy::Block => {
                log_debug!(node, "job {} blocked", id);
                self.waiting_requests
                    .add(WaitingRequest::new(job, origin.unwrap_or(own), now), now);
                self.arm_reneging(node, id, class);
            }
            DropPolicy::WaitingQueue => {
                log_debug!(node, "job {} waits for admission", id);
                self.waiting_requests
                    .add(WaitingRequest::new(job, origin.unwrap_or(own), now), now);
                self.arm_reneging(node, id, class);
                if let Some(origin) = origin {
                    node.acknowledge(Section::Input, origin, Some(id));
                }
            }
            DropPolicy::Retrial => {
                node.send_self(Section::Input, NetEvent::Retrial(job), 0.);
                if let Some(origin) = origin {
                    node.acknowledge(Section::Input, origin, Some(id));
                }
            }
        }
    }

    /// Moves the oldest parked admission attempt into the buffer if the station has room for it.
    fn drain_waiting_request(&mut self, node: &Node) {
        let now = node.time();
        let admitted = node.ledger().size().saturating_sub(self.waiting_requests.size());
        if self.size.is_some_and(|size| admitted >= size) {
            return;
        }
        let Some(request) = self.waiting_requests.remove_first(now) else {
            return;
        };
        let (info, origin) = request.into_parts();
        let job = info.into_job();
        let class = job.class_id();
        if origin.node != node.id() && self.drop_policies[class] == DropPolicy::Block {
            node.acknowledge(Section::Input, origin, Some(job.id()));
        }
        self.put_strategies[class].put(JobInfo::new(job, now), &mut self.buffer, now);
    }

    /// Hands the next buffered job to the service section if it can take one.
    fn serve_next(&mut self, node: &Node, service: &ServiceSection) {
        let now = node.time();
        if self.get_strategy.is_polling() {
            if self.state == QueueState::Switching {
                return;
            }
            match self.get_strategy.select_next(&mut self.buffer, now) {
                Some(info) => {
                    self.state = QueueState::Warm;
                    self.dispatch(node, info);
                }
                None => self.request_switchover(node),
            }
        } else if !self.buffer.is_empty() && self.service_has_capacity(service) {
            if let Some(info) = self.get_strategy.select_next(&mut self.buffer, now) {
                self.state = QueueState::Warm;
                self.dispatch(node, info);
            }
        } else {
            self.state = QueueState::Cool;
        }
    }

    fn request_switchover(&mut self, node: &Node) {
        self.state = QueueState::Switching;
        node.forward(Section::Input, NetEvent::PollingServerNext, 0.);
    }

    fn dispatch(&mut self, node: &Node, info: JobInfo) {
        let now = node.time();
        let job = info.into_job();
        let id = job.id();
        let class = job.class_id();
        let timer = self.reneging.remove(&id);
        if let Some(timer) = timer {
            node.cancel(timer.token);
        }
        log_trace!(node, "job {} sent to service", id);
        node.forward(Section::Input, NetEvent::Job(job), 0.);
        if self.linked_to_ps {
            if let Impatience::Reneging(patience) = &self.impatience[class] {
                let remaining = match timer {
                    Some(timer) => (timer.deadline - now).max(0.),
                    None => node.sample(patience),
                };
                node.forward(Section::Input, NetEvent::RenegeNotice { job: id, remaining }, 0.);
            }
        }
    }

    fn put(&mut self, node: &Node, job: Job) {
        let now = node.time();
        let id = job.id();
        let class = job.class_id();
        self.put_strategies[class].put(JobInfo::new(job, now), &mut self.buffer, now);
        self.arm_reneging(node, id, class);
    }

    fn arm_reneging(&mut self, node: &Node, job_id: JobId, class: usize) {
        let Impatience::Reneging(patience) = &self.impatience[class] else {
            return;
        };
        let now = node.time();
        let delay = node.sample(patience);
        if let Some(old) = self.reneging.remove(&job_id) {
            node.cancel(old.token);
        }
        let token = node.send_self(Section::Input, NetEvent::Renege(job_id), delay);
        self.reneging.insert(
            job_id,
            RenegingTimer {
                deadline: now + delay,
                token,
            },
        );
    }

    fn will_balk(&self, node: &Node, job: &Job) -> bool {
        let Some(balking) = self.impatience[job.class_id()].balking() else {
            return false;
        };
        let observed = if balking.is_priority_aware() {
            let priority = job.priority();
            self.buffer.iter().filter(|e| e.job().priority() >= priority).count()
                + self
                    .waiting_requests
                    .iter()
                    .filter(|e| e.job().priority() >= priority)
                    .count()
        } else {
            self.buffer.size() + self.waiting_requests.size()
        };
        balking.will_balk(observed, node.ctx())
    }

    /// The arriving job is already in the station ledger, hence `<=`.
    fn has_capacity(&self, node: &Node) -> bool {
        self.size.map_or(true, |size| node.ledger().size() <= size)
    }

    fn service_has_capacity(&self, service: &ServiceSection) -> bool {
        self.max_running.map_or(true, |max| service.resident_jobs() < max)
    }
}
