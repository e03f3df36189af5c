//! Output section: hands finished jobs to the next component one at a time.

use std::collections::VecDeque;

use crate::component::Id;
use crate::job::Job;
use crate::message::{NetEvent, NetMessage, Origin, Section};
use crate::node::{Node, Outcome};
use crate::log_trace;

/// Blocking router.
///
/// Only one job is in flight towards the destination at a time. The service section is acknowledged when the
/// destination accepts that job, so a blocked destination holds the server.
pub struct Output {
    destination: Option<Id>,
    pending: VecDeque<Job>,
    awaiting_ack: bool,
    forwarded: u64,
}

impl Output {
    /// Creates a router. Without a destination jobs leave the network on completion.
    pub fn new(destination: Option<Id>) -> Self {
        Self {
            destination,
            pending: VecDeque::new(),
            awaiting_ack: false,
            forwarded: 0,
        }
    }

    /// Component receiving the jobs.
    pub fn destination(&self) -> Option<Id> {
        self.destination
    }

    pub(crate) fn set_destination(&mut self, destination: Option<Id>) {
        self.destination = destination;
    }

    /// Jobs waiting to be sent.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Jobs that left the station.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub(crate) fn process(&mut self, node: &mut Node, src: Id, msg: NetMessage) -> Outcome {
        let from_own_service = src == node.id() && msg.source_section == Section::Service;
        match msg.event {
            NetEvent::Job(job) if from_own_service => {
                self.pending.push_back(job);
                if !self.awaiting_ack {
                    self.send_next(node);
                }
                Outcome::Processed
            }
            NetEvent::Ack(_) if self.awaiting_ack => {
                self.awaiting_ack = false;
                node.backward(Section::Output, NetEvent::Ack(None), 0.);
                self.send_next(node);
                Outcome::Processed
            }
            NetEvent::Start | NetEvent::Stop => Outcome::Processed,
            _ => Outcome::NotProcessed,
        }
    }

    fn send_next(&mut self, node: &mut Node) {
        let now = node.time();
        while let Some(job) = self.pending.pop_front() {
            node.ledger_mut().remove(job.id(), now);
            node.send(Section::Output, Section::Input, NetEvent::JobRelease(job.id()), 0.);
            self.forwarded += 1;
            if let Some(region) = node.region() {
                let leaves_region = self.destination.map_or(true, |dst| !region.borrow().contains(dst));
                if leaves_region {
                    region.borrow_mut().decrease_occupancy(job.class_id());
                }
            }
            match self.destination {
                Some(dst) => {
                    log_trace!(node, "job {} sent to {}", job.id(), dst);
                    let to = Origin {
                        node: dst,
                        section: Section::Input,
                    };
                    node.send_to(Section::Output, to, NetEvent::Job(job), 0.);
                    self.awaiting_ack = true;
                    return;
                }
                None => {
                    log_trace!(node, "job {} left the network", job.id());
                    node.network().depart(&job, now);
                    node.backward(Section::Output, NetEvent::Ack(None), 0.);
                }
            }
        }
    }
}
