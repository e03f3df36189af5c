//! Messages exchanged between stations and between the sections of a station.

use serde::Serialize;

use crate::component::Id;
use crate::job::{Job, JobId};

/// One of the three sections every station is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    /// Admission queue.
    Input,
    /// Server, processor-sharing server or polling server.
    Service,
    /// Router towards the next station.
    Output,
}

impl Section {
    /// Section that receives jobs from this one inside the station.
    pub fn next(self) -> Option<Section> {
        match self {
            Section::Input => Some(Section::Service),
            Section::Service => Some(Section::Output),
            Section::Output => None,
        }
    }

    /// Section that feeds jobs to this one inside the station.
    pub fn previous(self) -> Option<Section> {
        match self {
            Section::Input => None,
            Section::Service => Some(Section::Input),
            Section::Output => Some(Section::Service),
        }
    }
}

/// Address of a section of some component, used to acknowledge the sender of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Sending component.
    pub node: Id,
    /// Sending section.
    pub section: Section,
}

/// Kind of a network message together with its payload.
#[derive(Clone, Debug, Serialize)]
pub enum NetEvent {
    /// Simulation start. Lets the queue dispatch preloaded jobs.
    Start,
    /// Simulation stop.
    Stop,
    /// A job is handed over.
    Job(Job),
    /// The receiver of a job is ready to accept another one.
    Ack(Option<JobId>),
    /// A processor-sharing server finished (or lost to reneging) a job.
    JobCompleted(JobId),
    /// A job held elsewhere may proceed.
    JobRelease(JobId),
    /// A job left the network.
    JobFinish(JobId),
    /// Patience deadline of a waiting job expired.
    Renege(JobId),
    /// Remaining patience of a job forwarded to a processor-sharing server.
    RenegeNotice {
        /// Job being served.
        job: JobId,
        /// Time left until the job abandons.
        remaining: f64,
    },
    /// A job found the buffer full and enters the retrial orbit.
    Retrial(Job),
    /// A job from the retrial orbit tries to enter again.
    RetrialJob(Job),
    /// A job evicted from service returns to the buffer.
    PreemptedJob(Job),
    /// Polling server asks for the next class, or the queue tells it to switch over.
    PollingServerNext,
    /// Polling server is idle and found no class worth switching to.
    PollingServerReady,
    /// A forked job part is joined back.
    Join(JobId),
}

impl NetEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            NetEvent::Start => "START",
            NetEvent::Stop => "STOP",
            NetEvent::Job(_) => "JOB",
            NetEvent::Ack(_) => "ACK",
            NetEvent::JobCompleted(_) => "JOB_COMPLETED",
            NetEvent::JobRelease(_) => "JOB_RELEASE",
            NetEvent::JobFinish(_) => "JOB_FINISH",
            NetEvent::Renege(_) => "RENEGE",
            NetEvent::RenegeNotice { .. } => "RENEGE_NOTICE",
            NetEvent::Retrial(_) => "RETRIAL",
            NetEvent::RetrialJob(_) => "RETRIAL_JOB",
            NetEvent::PreemptedJob(_) => "PREEMPTED_JOB",
            NetEvent::PollingServerNext => "POLLING_SERVER_NEXT",
            NetEvent::PollingServerReady => "POLLING_SERVER_READY",
            NetEvent::Join(_) => "JOIN",
        }
    }
}

/// Event payload carried between components.
#[derive(Clone, Debug, Serialize)]
pub struct NetMessage {
    /// What happened.
    pub event: NetEvent,
    /// Section that emitted the message.
    pub source_section: Section,
    /// Section that must process the message.
    pub target_section: Section,
}

impl NetMessage {
    /// Creates a message between two sections.
    pub fn new(event: NetEvent, source_section: Section, target_section: Section) -> Self {
        Self {
            event,
            source_section,
            target_section,
        }
    }
}
