//! Network-wide job accounting.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::component::Id;
use crate::job::{ClassId, Job, JobClass, JobId};
use crate::ledger::list::{Counters, Tally};
use crate::ledger::measure::{Metric, Observers, SharedMeasure};

/// One arrival of a job at a station.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Visit {
    /// Station visited.
    pub station: Id,
    /// Class of the job at arrival.
    pub class: ClassId,
    /// Arrival time.
    pub time: f64,
}

/// Ledger shared by all components of a network.
///
/// Stations report arrivals, drops, reneges, balks and retrials here; sinks and routers without a destination
/// report departures. It also hands out job identifiers.
pub struct NetworkLedger {
    next_job_id: JobId,
    in_system: Vec<usize>,
    total: Counters,
    class_counters: Vec<Counters>,
    visits: FxHashMap<JobId, Vec<Visit>>,
    last_change_time: f64,
    class_change_times: Vec<f64>,
    observers: Observers,
}

/// Network ledger shared between components.
pub type SharedNetworkLedger = Rc<RefCell<NetworkLedger>>;

impl NetworkLedger {
    /// Creates an empty ledger for the given number of classes.
    pub fn new(classes: usize) -> Self {
        Self {
            next_job_id: 0,
            in_system: vec![0; classes],
            total: Counters::default(),
            class_counters: vec![Counters::default(); classes],
            visits: FxHashMap::default(),
            last_change_time: 0.,
            class_change_times: vec![0.; classes],
            observers: Observers::new(classes),
        }
    }

    /// Creates a ledger wrapped for sharing.
    pub fn shared(classes: usize) -> SharedNetworkLedger {
        Rc::new(RefCell::new(Self::new(classes)))
    }

    /// Registers a measure. Queue length here means the number of jobs in the network.
    pub fn analyze(&mut self, metric: Metric, class: Option<ClassId>, measure: SharedMeasure) {
        self.observers.register(metric, class, measure);
    }

    /// Returns a fresh job identifier.
    pub fn next_job_id(&mut self) -> JobId {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }

    /// Creates a job that enters the network at `now`.
    pub fn create_job(&mut self, class: Rc<JobClass>, now: f64) -> Job {
        let job = Job::new(self.next_job_id(), class, now);
        self.sample_population(job.class_id(), now);
        if let Some(n) = self.in_system.get_mut(job.class_id()) {
            *n += 1;
        }
        self.count(job.class_id(), Tally::In, None, now);
        job
    }

    /// Records an arrival of the job at a station.
    pub fn record_visit(&mut self, job: &Job, station: Id, now: f64) {
        self.visits.entry(job.id()).or_default().push(Visit {
            station,
            class: job.class_id(),
            time: now,
        });
    }

    /// Stations visited by the job, in order.
    pub fn visits(&self, job_id: JobId) -> &[Visit] {
        self.visits.get(&job_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Records a job leaving the network through a sink.
    pub fn depart(&mut self, job: &Job, now: f64) {
        let class = job.class_id();
        self.leave(class, now);
        self.count(class, Tally::Out, Some(Metric::Throughput), now);
        let response = now - job.system_entering_time();
        for counters in [Some(&mut self.total), self.class_counters.get_mut(class)].into_iter().flatten() {
            counters.total_sojourn_time += response;
            counters.last_sojourn_time = response;
        }
        self.observers.update(Metric::ResponseTime, class, response, 1.);
    }

    /// Records a job dropped by a station.
    pub fn drop_job(&mut self, job: &Job, now: f64) {
        self.leave(job.class_id(), now);
        self.count(job.class_id(), Tally::Drop, Some(Metric::DropRate), now);
    }

    /// Records a job that abandoned a station.
    pub fn renege_job(&mut self, job: &Job, now: f64) {
        self.leave(job.class_id(), now);
        self.count(job.class_id(), Tally::Renege, Some(Metric::RenegingRate), now);
    }

    /// Records a job that balked at a station.
    pub fn balk_job(&mut self, job: &Job, now: f64) {
        self.leave(job.class_id(), now);
        self.count(job.class_id(), Tally::Balk, Some(Metric::BalkingRate), now);
    }

    /// Records a retrial attempt. The job stays in the network.
    pub fn retry_job(&mut self, job: &Job, now: f64) {
        self.count(job.class_id(), Tally::Retrial, Some(Metric::RetrialAttemptsRate), now);
    }

    /// Jobs currently in the network.
    pub fn jobs_in_system(&self) -> usize {
        self.in_system.iter().sum()
    }

    /// Jobs of the class currently in the network.
    pub fn jobs_in_system_of(&self, class: ClassId) -> usize {
        self.in_system.get(class).copied().unwrap_or(0)
    }

    /// Aggregate counters.
    pub fn counters(&self) -> &Counters {
        &self.total
    }

    /// Counters of the class.
    pub fn counters_of(&self, class: ClassId) -> Option<&Counters> {
        self.class_counters.get(class)
    }

    fn count(&mut self, class: ClassId, tally: Tally, metric: Option<Metric>, now: f64) {
        let total_elapsed = self.total.mark(tally, now);
        let class_elapsed = self
            .class_counters
            .get_mut(class)
            .map_or(total_elapsed, |c| c.mark(tally, now));
        if let Some(metric) = metric {
            self.observers.update_one(metric, Some(class), class_elapsed, 1.);
            self.observers.update_one(metric, None, total_elapsed, 1.);
        }
    }

    fn leave(&mut self, class: ClassId, now: f64) {
        self.sample_population(class, now);
        if let Some(n) = self.in_system.get_mut(class) {
            *n = n.saturating_sub(1);
        }
    }

    fn sample_population(&mut self, class: ClassId, now: f64) {
        let weight = now - self.last_change_time;
        let total = self.jobs_in_system() as f64;
        self.observers.update_one(Metric::QueueLength, None, total, weight);
        self.last_change_time = now;
        if let Some(last) = self.class_change_times.get_mut(class) {
            let weight = now - *last;
            *last = now;
            let of_class = self.jobs_in_system_of(class) as f64;
            self.observers.update_one(Metric::QueueLength, Some(class), of_class, weight);
        }
    }
}
