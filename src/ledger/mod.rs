//! Job accounting: ordered per-section ledgers, the network-wide ledger and the measures they feed.

mod info;
mod list;
mod measure;
mod network;

pub use info::{JobInfo, PsJobInfo, TrackedJob, TrackingId, WaitingRequest};
pub use list::{Counters, JobInfoList, RetrialOrbit};
pub use measure::{InverseMean, Measure, Metric, SampleLog, SharedMeasure, WeightedMean};
pub use network::{NetworkLedger, SharedNetworkLedger, Visit};
