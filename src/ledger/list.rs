//! Ordered job ledger with per-class indexes, counters and the retrial orbit.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::job::{ClassId, Job, JobId};
use crate::ledger::info::{JobInfo, TrackedJob, TrackingId};
use crate::ledger::measure::{Metric, Observers, SharedMeasure};

/// Counters and timestamps kept for the whole ledger and for every class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Counters {
    /// Jobs added.
    pub jobs_in: u64,
    /// Jobs removed on departure.
    pub jobs_out: u64,
    /// Jobs dropped.
    pub dropped: u64,
    /// Jobs that abandoned while waiting.
    pub reneged: u64,
    /// Jobs that refused to join.
    pub balked: u64,
    /// Re-admission attempts from the retrial orbit.
    pub retried: u64,
    /// Jobs sent to a blocking region entrance.
    pub redirected: u64,
    /// Time of the last addition.
    pub last_in_time: f64,
    /// Time of the last departure.
    pub last_out_time: f64,
    /// Time of the last drop.
    pub last_drop_time: f64,
    /// Time of the last renege.
    pub last_renege_time: f64,
    /// Time of the last balk.
    pub last_balk_time: f64,
    /// Time of the last retrial attempt.
    pub last_retrial_time: f64,
    /// Time of the last change of the resident set.
    pub last_modify_time: f64,
    /// Sum of sojourn times of departed jobs.
    pub total_sojourn_time: f64,
    /// Sojourn time of the last departed job.
    pub last_sojourn_time: f64,
}

#[derive(Clone, Copy)]
pub(crate) enum Tally {
    In,
    Out,
    Drop,
    Renege,
    Balk,
    Retrial,
    Redirect,
}

impl Counters {
    /// Counts an occurrence and returns the time elapsed since the previous one of the same kind.
    pub(crate) fn mark(&mut self, tally: Tally, now: f64) -> f64 {
        let (counter, last) = match tally {
            Tally::In => (&mut self.jobs_in, &mut self.last_in_time),
            Tally::Out => (&mut self.jobs_out, &mut self.last_out_time),
            Tally::Drop => (&mut self.dropped, &mut self.last_drop_time),
            Tally::Renege => (&mut self.reneged, &mut self.last_renege_time),
            Tally::Balk => (&mut self.balked, &mut self.last_balk_time),
            Tally::Retrial => (&mut self.retried, &mut self.last_retrial_time),
            Tally::Redirect => {
                self.redirected += 1;
                self.jobs_in = self.jobs_in.saturating_sub(1);
                return 0.;
            }
        };
        *counter += 1;
        let elapsed = now - *last;
        *last = now;
        elapsed
    }
}

/// Jobs waiting for a retry, with the time of every failed attempt.
#[derive(Clone, Debug, Default)]
pub struct RetrialOrbit {
    attempts: FxHashMap<JobId, (ClassId, Vec<f64>)>,
    per_class: Vec<usize>,
    last_change_time: f64,
}

impl RetrialOrbit {
    fn new(classes: usize) -> Self {
        Self {
            attempts: FxHashMap::default(),
            per_class: vec![0; classes],
            last_change_time: 0.,
        }
    }

    /// Number of jobs in the orbit.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Returns `true` if no job is waiting for a retry.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Number of jobs of the class in the orbit.
    pub fn len_of(&self, class: ClassId) -> usize {
        self.per_class.get(class).copied().unwrap_or(0)
    }

    /// Returns `true` if the job is in the orbit.
    pub fn contains(&self, job_id: JobId) -> bool {
        self.attempts.contains_key(&job_id)
    }

    /// Times at which the job entered the orbit, oldest first.
    pub fn attempts(&self, job_id: JobId) -> Option<&[f64]> {
        self.attempts.get(&job_id).map(|(_, times)| times.as_slice())
    }
}

/// Ordered collection of job records with per-class views.
///
/// The global order is the service order of the owner. Every mutation takes the current time so that
/// time-weighted measures (queue length, utilization) can be sampled over the interval that just ended.
pub struct JobInfoList<T: TrackedJob = JobInfo> {
    entries: VecDeque<T>,
    per_class: Vec<VecDeque<TrackingId>>,
    total: Counters,
    class_counters: Vec<Counters>,
    servers: usize,
    orbit: RetrialOrbit,
    observers: Observers,
}

impl<T: TrackedJob> JobInfoList<T> {
    /// Creates an empty ledger for the given number of classes.
    pub fn new(classes: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            per_class: vec![VecDeque::new(); classes],
            total: Counters::default(),
            class_counters: vec![Counters::default(); classes],
            servers: 1,
            orbit: RetrialOrbit::new(classes),
            observers: Observers::new(classes),
        }
    }

    /// Sets the number of servers used to derive utilization from the number of resident jobs.
    pub fn set_servers(&mut self, servers: usize) {
        self.servers = servers.max(1);
    }

    /// Registers a measure for the metric, for one class or for all classes together.
    pub fn analyze(&mut self, metric: Metric, class: Option<ClassId>, measure: SharedMeasure) {
        self.observers.register(metric, class, measure);
    }

    /// Number of classes.
    pub fn classes(&self) -> usize {
        self.per_class.len()
    }

    /// Number of resident jobs.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Number of resident jobs of the class.
    pub fn size_of(&self, class: ClassId) -> usize {
        self.per_class.get(class).map_or(0, |ids| ids.len())
    }

    /// Returns `true` if there are no resident jobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resident records in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Mutable access to resident records in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    /// Resident records of the class in order.
    pub fn iter_class(&self, class: ClassId) -> impl Iterator<Item = &T> {
        self.entries.iter().filter(move |e| e.class_id() == class)
    }

    /// Tracking ids of the class in order.
    pub fn tracking_ids_of(&self, class: ClassId) -> impl Iterator<Item = TrackingId> + '_ {
        self.per_class.get(class).into_iter().flat_map(|ids| ids.iter().copied())
    }

    /// First record.
    pub fn first(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Last record.
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    /// First record of the class.
    pub fn first_of(&self, class: ClassId) -> Option<&T> {
        let id = *self.per_class.get(class)?.front()?;
        self.entries.iter().find(|e| e.tracking_id() == id)
    }

    /// Record of the job, if resident.
    pub fn look_for(&self, job_id: JobId) -> Option<&T> {
        self.entries.iter().find(|e| e.job_id() == job_id)
    }

    /// Mutable record of the job, if resident.
    pub fn look_for_mut(&mut self, job_id: JobId) -> Option<&mut T> {
        self.entries.iter_mut().find(|e| e.job_id() == job_id)
    }

    /// Returns `true` if the job is resident.
    pub fn contains(&self, job_id: JobId) -> bool {
        self.look_for(job_id).is_some()
    }

    /// Returns `true` if the record with the given tracking id is resident.
    pub fn contains_tracked(&self, tracking_id: TrackingId) -> bool {
        self.entries.iter().any(|e| e.tracking_id() == tracking_id)
    }

    /// Aggregate counters.
    pub fn counters(&self) -> &Counters {
        &self.total
    }

    /// Counters of the class.
    pub fn counters_of(&self, class: ClassId) -> Option<&Counters> {
        self.class_counters.get(class)
    }

    /// Appends a record.
    pub fn add(&mut self, entry: T, now: f64) {
        let index = self.entries.len();
        self.insert(index, entry, now);
    }

    /// Prepends a record.
    pub fn add_first(&mut self, entry: T, now: f64) {
        self.insert(0, entry, now);
    }

    /// Inserts a record at `index` of the global order. Indexes past the end append.
    pub fn insert(&mut self, index: usize, entry: T, now: f64) {
        let class = entry.class_id();
        self.place(index, entry, now);
        self.mark(class, Tally::In, now);
    }

    /// Re-admits a job coming back from the retrial orbit.
    pub fn retry_job(&mut self, entry: T, now: f64) {
        let class = entry.class_id();
        let index = self.entries.len();
        self.place(index, entry, now);
        let (class_elapsed, total_elapsed) = self.mark(class, Tally::Retrial, now);
        self.observers
            .update_one(Metric::RetrialAttemptsRate, Some(class), class_elapsed, 1.);
        self.observers.update_one(Metric::RetrialAttemptsRate, None, total_elapsed, 1.);
    }

    /// Removes a departing job and records its sojourn.
    pub fn remove(&mut self, job_id: JobId, now: f64) -> Option<T> {
        let pos = self.position(job_id)?;
        let entry = self.take(pos, now)?;
        self.record_departure(&entry, now);
        Some(entry)
    }

    /// Removes the record with the given tracking id as a departure.
    pub fn remove_tracked(&mut self, tracking_id: TrackingId, now: f64) -> Option<T> {
        let pos = self.entries.iter().position(|e| e.tracking_id() == tracking_id)?;
        let entry = self.take(pos, now)?;
        self.record_departure(&entry, now);
        Some(entry)
    }

    /// Removes the first record as a departure.
    pub fn remove_first(&mut self, now: f64) -> Option<T> {
        let entry = self.take(0, now)?;
        self.record_departure(&entry, now);
        Some(entry)
    }

    /// Removes the last record as a departure.
    pub fn remove_last(&mut self, now: f64) -> Option<T> {
        let pos = self.entries.len().checked_sub(1)?;
        let entry = self.take(pos, now)?;
        self.record_departure(&entry, now);
        Some(entry)
    }

    /// Removes the first record of the class as a departure.
    pub fn remove_first_of(&mut self, class: ClassId, now: f64) -> Option<T> {
        let id = *self.per_class.get(class)?.front()?;
        self.remove_tracked(id, now)
    }

    /// Removes the last record of the class as a departure.
    pub fn remove_last_of(&mut self, class: ClassId, now: f64) -> Option<T> {
        let id = *self.per_class.get(class)?.back()?;
        self.remove_tracked(id, now)
    }

    /// Removes a dropped job.
    pub fn drop_job(&mut self, job_id: JobId, now: f64) -> Option<T> {
        self.remove_counted(job_id, Tally::Drop, Metric::DropRate, now)
    }

    /// Removes a job that abandoned while waiting.
    pub fn renege_job(&mut self, job_id: JobId, now: f64) -> Option<T> {
        self.remove_counted(job_id, Tally::Renege, Metric::RenegingRate, now)
    }

    /// Removes a job that refused to join.
    pub fn balk_job(&mut self, job_id: JobId, now: f64) -> Option<T> {
        self.remove_counted(job_id, Tally::Balk, Metric::BalkingRate, now)
    }

    /// Removes a job sent elsewhere before being admitted. It no longer counts as an arrival.
    pub fn redirect_job(&mut self, job_id: JobId, now: f64) -> Option<T> {
        let pos = self.position(job_id)?;
        let entry = self.take(pos, now)?;
        self.mark(entry.class_id(), Tally::Redirect, now);
        Some(entry)
    }

    /// Removes a job that moves to the retrial orbit. Counters are left untouched, the job is expected back.
    pub fn park(&mut self, job_id: JobId, now: f64) -> Option<T> {
        let pos = self.position(job_id)?;
        self.take(pos, now)
    }

    /// Records a failed admission attempt of the job in the retrial orbit.
    pub fn add_to_retrial_orbit(&mut self, job: &Job, now: f64) {
        let class = job.class_id();
        self.sample_orbit(now);
        let (_, times) = self.orbit.attempts.entry(job.id()).or_insert_with(|| (class, Vec::new()));
        let is_new = times.is_empty();
        times.push(now);
        if is_new {
            if let Some(n) = self.orbit.per_class.get_mut(class) {
                *n += 1;
            }
        }
    }

    /// Takes the job out of the retrial orbit and returns the times of its failed attempts.
    pub fn remove_from_retrial_orbit(&mut self, job_id: JobId, now: f64) -> Option<Vec<f64>> {
        if !self.orbit.contains(job_id) {
            return None;
        }
        self.sample_orbit(now);
        let (class, times) = self.orbit.attempts.remove(&job_id)?;
        if let Some(n) = self.orbit.per_class.get_mut(class) {
            *n = n.saturating_sub(1);
        }
        Some(times)
    }

    /// Retrial orbit of the ledger.
    pub fn retrial_orbit(&self) -> &RetrialOrbit {
        &self.orbit
    }

    /// Records the time a job waited before being admitted.
    pub fn update_waiting_time(&mut self, class: ClassId, waiting_time: f64) {
        self.observers.update(Metric::WaitingTime, class, waiting_time, 1.);
    }

    fn position(&self, job_id: JobId) -> Option<usize> {
        self.entries.iter().position(|e| e.job_id() == job_id)
    }

    fn place(&mut self, index: usize, entry: T, now: f64) {
        let class = entry.class_id();
        self.sample_occupancy(class, now);
        let index = index.min(self.entries.len());
        let class_pos = if index == self.entries.len() {
            self.size_of(class)
        } else {
            self.entries.iter().take(index).filter(|e| e.class_id() == class).count()
        };
        if let Some(ids) = self.per_class.get_mut(class) {
            ids.insert(class_pos, entry.tracking_id());
        }
        self.entries.insert(index, entry);
        self.touch(class, now);
    }

    fn take(&mut self, pos: usize, now: f64) -> Option<T> {
        let class = self.entries.get(pos)?.class_id();
        self.sample_occupancy(class, now);
        let entry = self.entries.remove(pos)?;
        if let Some(ids) = self.per_class.get_mut(class) {
            ids.retain(|id| *id != entry.tracking_id());
        }
        self.touch(class, now);
        Some(entry)
    }

    fn remove_counted(&mut self, job_id: JobId, tally: Tally, metric: Metric, now: f64) -> Option<T> {
        let pos = self.position(job_id)?;
        let entry = self.take(pos, now)?;
        let (class_elapsed, total_elapsed) = self.mark(entry.class_id(), tally, now);
        self.observers
            .update_one(metric, Some(entry.class_id()), class_elapsed, 1.);
        self.observers.update_one(metric, None, total_elapsed, 1.);
        Some(entry)
    }

    fn record_departure(&mut self, entry: &T, now: f64) {
        let class = entry.class_id();
        let sojourn = now - entry.entering_time();
        let (class_elapsed, total_elapsed) = self.mark(class, Tally::Out, now);
        for counters in [Some(&mut self.total), self.class_counters.get_mut(class)].into_iter().flatten() {
            counters.total_sojourn_time += sojourn;
            counters.last_sojourn_time = sojourn;
        }
        self.observers.update(Metric::ResponseTime, class, sojourn, 1.);
        self.observers.update(Metric::ResidenceTime, class, sojourn, 1.);
        self.observers.update_one(Metric::Throughput, Some(class), class_elapsed, 1.);
        self.observers.update_one(Metric::Throughput, None, total_elapsed, 1.);
    }

    fn mark(&mut self, class: ClassId, tally: Tally, now: f64) -> (f64, f64) {
        let total_elapsed = self.total.mark(tally, now);
        let class_elapsed = self
            .class_counters
            .get_mut(class)
            .map_or(total_elapsed, |c| c.mark(tally, now));
        (class_elapsed, total_elapsed)
    }

    fn sample_occupancy(&self, class: ClassId, now: f64) {
        let servers = self.servers as f64;
        let total_weight = now - self.total.last_modify_time;
        let total_size = self.entries.len() as f64;
        self.observers.update_one(Metric::QueueLength, None, total_size, total_weight);
        self.observers
            .update_one(Metric::Utilization, None, total_size / servers, total_weight);
        if let Some(counters) = self.class_counters.get(class) {
            let weight = now - counters.last_modify_time;
            let size = self.size_of(class) as f64;
            self.observers.update_one(Metric::QueueLength, Some(class), size, weight);
            self.observers
                .update_one(Metric::Utilization, Some(class), size / servers, weight);
        }
    }

    fn sample_orbit(&mut self, now: f64) {
        let weight = now - self.orbit.last_change_time;
        self.observers
            .update_one(Metric::RetrialOrbitSize, None, self.orbit.len() as f64, weight);
        for (class, n) in self.orbit.per_class.iter().enumerate() {
            self.observers
                .update_one(Metric::RetrialOrbitSize, Some(class), *n as f64, weight);
        }
        self.orbit.last_change_time = now;
    }

    fn touch(&mut self, class: ClassId, now: f64) {
        self.total.last_modify_time = now;
        if let Some(counters) = self.class_counters.get_mut(class) {
            counters.last_modify_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use approx::assert_relative_eq;

    use crate::job::JobClass;
    use crate::ledger::measure::{SampleLog, WeightedMean};

    use super::*;

    fn job(id: JobId, class: &Rc<JobClass>) -> Job {
        Job::new(id, class.clone(), 0.)
    }

    fn classes() -> (Rc<JobClass>, Rc<JobClass>) {
        (Rc::new(JobClass::open(0, "a")), Rc::new(JobClass::open(1, "b")))
    }

    #[test]
    fn per_class_views_follow_global_order() {
        let (a, b) = classes();
        let mut list: JobInfoList = JobInfoList::new(2);
        list.add(JobInfo::new(job(1, &a), 0.), 0.);
        list.add(JobInfo::new(job(2, &b), 0.), 0.);
        list.add_first(JobInfo::new(job(3, &a), 0.), 0.);
        list.insert(1, JobInfo::new(job(4, &a), 0.), 0.);

        let global: Vec<JobId> = list.iter().map(|e| e.job_id()).collect();
        assert_eq!(global, vec![3, 4, 1, 2]);
        let class_a: Vec<JobId> = list.iter_class(0).map(|e| e.job_id()).collect();
        assert_eq!(class_a, vec![3, 4, 1]);
        assert_eq!(list.first_of(0).map(|e| e.job_id()), Some(3));
        assert_eq!(list.first_of(1).map(|e| e.job_id()), Some(2));
        assert_eq!(list.size_of(0), 3);

        assert_eq!(list.remove_last_of(0, 1.).map(|e| e.job_id()), Some(1));
        assert_eq!(list.remove_first_of(0, 1.).map(|e| e.job_id()), Some(3));
        assert_eq!(list.size_of(0), 1);
        assert_eq!(list.counters().jobs_out, 2);
    }

    #[test]
    fn removal_kinds_update_their_counters() {
        let (a, b) = classes();
        let mut list: JobInfoList = JobInfoList::new(2);
        for id in 0..5 {
            let class = if id % 2 == 0 { &a } else { &b };
            list.add(JobInfo::new(job(id, class), 0.), 0.);
        }
        list.drop_job(0, 1.);
        list.renege_job(1, 2.);
        list.balk_job(2, 3.);
        list.redirect_job(3, 3.);
        assert!(list.drop_job(42, 4.).is_none());

        let total = list.counters();
        assert_eq!(total.dropped, 1);
        assert_eq!(total.reneged, 1);
        assert_eq!(total.balked, 1);
        assert_eq!(total.redirected, 1);
        assert_eq!(total.jobs_in, 4);
        assert_eq!(total.last_renege_time, 2.);
        assert_eq!(list.counters_of(1).unwrap().reneged, 1);
        assert_eq!(list.size(), 1);
    }

    #[test]
    fn queue_length_is_time_weighted() {
        let (a, _) = classes();
        let mut list: JobInfoList = JobInfoList::new(2);
        let queue_length = WeightedMean::shared();
        list.analyze(Metric::QueueLength, None, queue_length.clone());

        list.add(JobInfo::new(job(1, &a), 0.), 0.);
        list.add(JobInfo::new(job(2, &a), 1.), 1.);
        list.remove_first(3.);
        list.remove_first(4.);

        // 0 jobs for 0, 1 job for 1, 2 jobs for 2, 1 job for 1
        assert_relative_eq!(queue_length.borrow().mean().unwrap(), 6. / 4.);
    }

    #[test]
    fn departures_feed_response_time() {
        let (a, _) = classes();
        let mut list: JobInfoList = JobInfoList::new(2);
        let response = SampleLog::shared();
        list.analyze(Metric::ResponseTime, Some(0), response.clone());
        list.add(JobInfo::new(job(1, &a), 2.), 2.);
        list.remove(1, 5.5);
        assert_eq!(response.borrow().values(), vec![3.5]);
        assert_relative_eq!(list.counters().total_sojourn_time, 3.5);
    }

    #[test]
    fn retrial_orbit_keeps_attempt_times() {
        let (a, _) = classes();
        let mut list: JobInfoList = JobInfoList::new(2);
        let j = job(7, &a);
        list.add(JobInfo::new(j.clone(), 0.), 0.);
        assert!(list.park(7, 1.).is_some());
        list.add_to_retrial_orbit(&j, 1.);
        list.add_to_retrial_orbit(&j, 2.5);
        assert_eq!(list.retrial_orbit().len(), 1);
        assert_eq!(list.retrial_orbit().len_of(0), 1);
        assert_eq!(list.retrial_orbit().attempts(7), Some(&[1., 2.5][..]));

        list.retry_job(JobInfo::new(j, 3.), 3.);
        assert_eq!(list.counters().retried, 1);
        assert_eq!(list.counters().jobs_in, 1);
        assert_eq!(list.remove_from_retrial_orbit(7, 3.), Some(vec![1., 2.5]));
        assert!(list.retrial_orbit().is_empty());
        assert_eq!(list.remove_from_retrial_orbit(7, 3.), None);
    }
}
