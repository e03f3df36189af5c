//! Ledger entries.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::job::{ClassId, Job, JobId};
use crate::message::Origin;

/// Identity of a ledger entry, unique across all ledgers of the process.
///
/// A job may be recorded by several ledgers at once; each record gets its own tracking id, which is what
/// per-class indexes and gated polling snapshots refer to.
pub type TrackingId = u64;

static NEXT_TRACKING_ID: AtomicU64 = AtomicU64::new(0);

fn next_tracking_id() -> TrackingId {
    NEXT_TRACKING_ID.fetch_add(1, Ordering::Relaxed)
}

/// Anything a [`JobInfoList`](super::JobInfoList) can hold.
pub trait TrackedJob {
    /// Recorded job.
    fn job(&self) -> &Job;
    /// Mutable access to the recorded job.
    fn job_mut(&mut self) -> &mut Job;
    /// Time the entry was created.
    fn entering_time(&self) -> f64;
    /// Identity of this entry.
    fn tracking_id(&self) -> TrackingId;

    /// Id of the recorded job.
    fn job_id(&self) -> JobId {
        self.job().id()
    }

    /// Class of the recorded job.
    fn class_id(&self) -> ClassId {
        self.job().class_id()
    }
}

/// A job together with the time it entered the ledger.
#[derive(Clone, Debug)]
pub struct JobInfo {
    job: Job,
    entering_time: f64,
    tracking_id: TrackingId,
}

impl JobInfo {
    /// Records `job` as entering at `now`.
    pub fn new(job: Job, now: f64) -> Self {
        Self {
            job,
            entering_time: now,
            tracking_id: next_tracking_id(),
        }
    }

    /// Releases the job.
    pub fn into_job(self) -> Job {
        self.job
    }
}

impl TrackedJob for JobInfo {
    fn job(&self) -> &Job {
        &self.job
    }

    fn job_mut(&mut self) -> &mut Job {
        &mut self.job
    }

    fn entering_time(&self) -> f64 {
        self.entering_time
    }

    fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }
}

/// An admission attempt parked while the buffer is full, with the section to acknowledge later.
#[derive(Clone, Debug)]
pub struct WaitingRequest {
    info: JobInfo,
    origin: Origin,
}

impl WaitingRequest {
    /// Parks `job` sent by `origin`.
    pub fn new(job: Job, origin: Origin, now: f64) -> Self {
        Self {
            info: JobInfo::new(job, now),
            origin,
        }
    }

    /// Sender of the job.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Splits the request into the job record and its sender.
    pub fn into_parts(self) -> (JobInfo, Origin) {
        (self.info, self.origin)
    }
}

impl TrackedJob for WaitingRequest {
    fn job(&self) -> &Job {
        self.info.job()
    }

    fn job_mut(&mut self) -> &mut Job {
        self.info.job_mut()
    }

    fn entering_time(&self) -> f64 {
        self.info.entering_time()
    }

    fn tracking_id(&self) -> TrackingId {
        self.info.tracking_id()
    }
}

/// A job shared by a processor-sharing server.
#[derive(Clone, Debug)]
pub struct PsJobInfo {
    info: JobInfo,
    service_time: f64,
    residual_service_time: f64,
    reneging_delay: Option<f64>,
}

impl PsJobInfo {
    /// Records `job` with its full service demand.
    pub fn new(job: Job, service_time: f64, now: f64) -> Self {
        Self {
            info: JobInfo::new(job, now),
            service_time,
            residual_service_time: service_time,
            reneging_delay: None,
        }
    }

    /// Full service demand.
    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    /// Demand still to be served.
    pub fn residual_service_time(&self) -> f64 {
        self.residual_service_time
    }

    /// Decreases the residual demand by `amount`, never below zero.
    pub fn perform_service(&mut self, amount: f64) {
        self.residual_service_time = (self.residual_service_time - amount).max(0.);
    }

    /// Time left until the job abandons, if it is impatient.
    pub fn reneging_delay(&self) -> Option<f64> {
        self.reneging_delay
    }

    /// Sets the time left until the job abandons.
    pub fn set_reneging_delay(&mut self, delay: Option<f64>) {
        self.reneging_delay = delay;
    }

    /// Advances the patience clock by `elapsed`.
    pub fn consume_patience(&mut self, elapsed: f64) {
        if let Some(delay) = self.reneging_delay.as_mut() {
            *delay -= elapsed;
        }
    }

    /// Releases the job.
    pub fn into_job(self) -> Job {
        self.info.into_job()
    }
}

impl TrackedJob for PsJobInfo {
    fn job(&self) -> &Job {
        self.info.job()
    }

    fn job_mut(&mut self) -> &mut Job {
        self.info.job_mut()
    }

    fn entering_time(&self) -> f64 {
        self.info.entering_time()
    }

    fn tracking_id(&self) -> TrackingId {
        self.info.tracking_id()
    }
}
