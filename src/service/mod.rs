//! Service sections.

mod polling;
mod ps;
mod server;

pub use polling::PollingServer;
pub use ps::{PsServer, PsStats, PsStrategy};
pub use server::Server;

use crate::component::Id;
use crate::message::NetMessage;
use crate::node::{Node, Outcome};

/// Service section of a station.
pub enum ServiceSection {
    /// Single or multi-server, optionally preemptive.
    Server(Server),
    /// Processor sharing.
    ProcessorSharing(PsServer),
    /// Cyclic polling.
    Polling(PollingServer),
}

impl ServiceSection {
    /// Jobs occupying the section, used by the queue to enforce its running-jobs cap.
    pub fn resident_jobs(&self) -> usize {
        match self {
            ServiceSection::Server(server) => server.resident_jobs(),
            ServiceSection::ProcessorSharing(server) => server.resident_jobs(),
            ServiceSection::Polling(server) => server.resident_jobs(),
        }
    }

    /// Returns `true` for processor sharing.
    pub fn is_processor_sharing(&self) -> bool {
        matches!(self, ServiceSection::ProcessorSharing(_))
    }

    /// Returns `true` for polling.
    pub fn is_polling(&self) -> bool {
        matches!(self, ServiceSection::Polling(_))
    }

    /// The server, if this is one.
    pub fn as_server(&self) -> Option<&Server> {
        match self {
            ServiceSection::Server(server) => Some(server),
            _ => None,
        }
    }

    /// The processor-sharing server, if this is one.
    pub fn as_processor_sharing(&self) -> Option<&PsServer> {
        match self {
            ServiceSection::ProcessorSharing(server) => Some(server),
            _ => None,
        }
    }

    /// The polling server, if this is one.
    pub fn as_polling(&self) -> Option<&PollingServer> {
        match self {
            ServiceSection::Polling(server) => Some(server),
            _ => None,
        }
    }

    pub(crate) fn process(&mut self, node: &mut Node, src: Id, msg: NetMessage) -> Outcome {
        match self {
            ServiceSection::Server(server) => server.process(node, src, msg),
            ServiceSection::ProcessorSharing(server) => server.process(node, src, msg),
            ServiceSection::Polling(server) => server.process(node, src, msg),
        }
    }
}
