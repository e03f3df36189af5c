//! Jobs and job classes.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::component::Id;
use crate::error::ConfigError;
use crate::event::EventId;

/// Index of a job class, dense from zero.
pub type ClassId = usize;

/// Network-wide job identifier.
pub type JobId = u64;

/// Whether jobs of a class come from outside or circulate forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Jobs arrive from a source and leave through a sink.
    Open,
    /// A fixed population of jobs circulates in the network.
    Closed,
}

/// Static description of a job class shared by all its jobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobClass {
    /// Class index.
    pub id: ClassId,
    /// Human readable name used in logs.
    pub name: String,
    /// Open or closed.
    pub kind: ClassKind,
    /// Larger value means higher priority.
    #[serde(default)]
    pub priority: i32,
    /// Number of circulating jobs for closed classes.
    #[serde(default)]
    pub population: usize,
}

impl JobClass {
    /// Creates an open class with default priority.
    pub fn open(id: ClassId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            kind: ClassKind::Open,
            priority: 0,
            population: 0,
        }
    }

    /// Creates a closed class with the given population.
    pub fn closed(id: ClassId, name: &str, population: usize) -> Self {
        Self {
            id,
            name: name.to_owned(),
            kind: ClassKind::Closed,
            priority: 0,
            population,
        }
    }

    /// Sets the class priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Checks that class ids are dense and wraps every class into `Rc` for sharing between jobs.
pub fn class_list(classes: Vec<JobClass>) -> Result<Vec<Rc<JobClass>>, ConfigError> {
    if classes.is_empty() {
        return Err(ConfigError::NoClasses);
    }
    classes
        .into_iter()
        .enumerate()
        .map(|(index, class)| {
            if class.id != index {
                Err(ConfigError::ClassIdMismatch { index, id: class.id })
            } else {
                Ok(Rc::new(class))
            }
        })
        .collect()
}

/// A unit of work moving through the network.
///
/// A job is owned by exactly one section at a time: it travels by value inside messages, and sections keep it in
/// their ledgers while it resides there.
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    id: JobId,
    class: Rc<JobClass>,
    system_entering_time: f64,
    service_time: Option<f64>,
    service_arrival_time: f64,
    in_service: bool,
    preempted: bool,
    #[serde(skip)]
    serving_event: Option<EventId>,
    original_destination: Option<Id>,
}

impl Job {
    /// Creates a job that enters the network at `now`.
    pub fn new(id: JobId, class: Rc<JobClass>, now: f64) -> Self {
        Self {
            id,
            class,
            system_entering_time: now,
            service_time: None,
            service_arrival_time: 0.,
            in_service: false,
            preempted: false,
            serving_event: None,
            original_destination: None,
        }
    }

    /// Returns the job identifier.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Returns the current class of the job.
    pub fn class(&self) -> &Rc<JobClass> {
        &self.class
    }

    /// Returns the index of the current class.
    pub fn class_id(&self) -> ClassId {
        self.class.id
    }

    /// Returns the priority of the current class.
    pub fn priority(&self) -> i32 {
        self.class.priority
    }

    /// Switches the job to another class, e.g. on class-switch routing.
    pub fn set_class(&mut self, class: Rc<JobClass>) {
        self.class = class;
    }

    /// Returns the time the job entered the network.
    pub fn system_entering_time(&self) -> f64 {
        self.system_entering_time
    }

    /// Restarts the network residence clock. Used when a closed-class job completes a cycle.
    pub fn reset_system_entering_time(&mut self, now: f64) {
        self.system_entering_time = now;
    }

    /// Service demand assigned to the job, or the residual demand if its service was preempted.
    pub fn service_time(&self) -> Option<f64> {
        self.service_time
    }

    /// Sets the service demand, `None` means it is drawn on the next service start.
    pub fn set_service_time(&mut self, service_time: Option<f64>) {
        self.service_time = service_time;
    }

    /// Returns the time the current service started.
    pub fn service_arrival_time(&self) -> f64 {
        self.service_arrival_time
    }

    /// Sets the time the current service started.
    pub fn set_service_arrival_time(&mut self, time: f64) {
        self.service_arrival_time = time;
    }

    /// Returns `true` while a server is working on the job.
    pub fn is_in_service(&self) -> bool {
        self.in_service
    }

    /// Marks the job as being served or not.
    pub fn set_in_service(&mut self, in_service: bool) {
        self.in_service = in_service;
    }

    /// Returns `true` if the job was evicted from a server and waits to resume.
    pub fn is_preempted(&self) -> bool {
        self.preempted
    }

    /// Marks the job as preempted or not.
    pub fn set_preempted(&mut self, preempted: bool) {
        self.preempted = preempted;
    }

    /// Pending completion event of the job in a server, if any.
    pub fn serving_event(&self) -> Option<EventId> {
        self.serving_event
    }

    /// Stores the pending completion event.
    pub fn set_serving_event(&mut self, event: Option<EventId>) {
        self.serving_event = event;
    }

    /// Station the job was heading to before it was redirected to a blocking region entrance.
    pub fn original_destination(&self) -> Option<Id> {
        self.original_destination
    }

    /// Stores the station the job was heading to.
    pub fn set_original_destination(&mut self, station: Option<Id>) {
        self.original_destination = station;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_list_requires_dense_ids() {
        let ok = class_list(vec![JobClass::open(0, "a"), JobClass::closed(1, "b", 3)]).unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[1].population, 3);

        let err = class_list(vec![JobClass::open(1, "a")]).unwrap_err();
        assert!(matches!(err, ConfigError::ClassIdMismatch { index: 0, id: 1 }));
        assert!(matches!(class_list(vec![]), Err(ConfigError::NoClasses)));
    }

    #[test]
    fn job_serializes_with_class() {
        let class = Rc::new(JobClass::open(0, "web").with_priority(2));
        let job = Job::new(5, class, 1.5);
        assert_eq!(job.priority(), 2);
        let text = serde_json::to_string(&job).unwrap();
        assert!(text.contains("\"name\":\"web\""));
        assert!(text.contains("\"system_entering_time\":1.5"));
    }
}
