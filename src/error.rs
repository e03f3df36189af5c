//! Configuration errors.

use thiserror::Error;

use crate::job::ClassId;

/// Error raised when a station, a distribution or a policy is configured inconsistently.
///
/// All configuration problems are detected when a station is built, never during the simulation run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Distribution parameters are out of range.
    #[error("invalid {kind} distribution: {reason}")]
    InvalidDistribution {
        /// Distribution name.
        kind: &'static str,
        /// What is wrong with the parameters.
        reason: String,
    },
    /// A per-class parameter list does not cover all classes.
    #[error("{what} has {actual} entries, expected one per class ({expected})")]
    ClassCountMismatch {
        /// Name of the parameter list.
        what: &'static str,
        /// Number of classes in the network.
        expected: usize,
        /// Number of entries supplied.
        actual: usize,
    },
    /// Class identifiers must be dense and match their position.
    #[error("class at position {index} has id {id}")]
    ClassIdMismatch {
        /// Position in the class list.
        index: usize,
        /// Identifier stored in the class.
        id: ClassId,
    },
    /// The network defines no job classes.
    #[error("at least one job class is required")]
    NoClasses,
    /// Unrecognized drop policy name.
    #[error("unknown drop policy \"{0}\"")]
    UnknownDropPolicy(String),
    /// The retrial drop policy is used for a class without a retrial delay.
    #[error("class {class} uses the retrial drop policy but has no retrial impatience")]
    MissingRetrialDelay {
        /// Offending class.
        class: ClassId,
    },
    /// Server count must be positive.
    #[error("station needs at least one server")]
    NoServers,
    /// Limited polling must serve at least one job per visit.
    #[error("limited polling needs a positive per-visit limit")]
    InvalidPollingLimit,
    /// A polling get strategy was combined with a non-polling server or vice versa.
    #[error("polling get strategy and polling server must be used together")]
    PollingMismatch,
    /// A preemptive put strategy needs a preemptive server to evict from.
    #[error("class {class} uses a preemptive put strategy but the server is not preemptive")]
    PreemptionMismatch {
        /// Offending class.
        class: ClassId,
    },
    /// Queue size must be -1 (infinite) or non-negative.
    #[error("invalid queue size {0}")]
    InvalidQueueSize(i64),
    /// Maximum number of running jobs must be -1 (unbounded) or positive.
    #[error("invalid max running jobs {0}")]
    InvalidMaxRunning(i64),
    /// Processor sharing weights must be positive.
    #[error("weight of class {class} must be positive, got {weight}")]
    InvalidWeight {
        /// Offending class.
        class: ClassId,
        /// Supplied weight.
        weight: f64,
    },
    /// Balking ranges are malformed.
    #[error("invalid balking ranges for class {class}: {reason}")]
    InvalidBalking {
        /// Offending class.
        class: ClassId,
        /// What is wrong with the ranges.
        reason: String,
    },
    /// Preloaded job counts do not match the class list or exceed the buffer.
    #[error("invalid preload: {0}")]
    InvalidPreload(String),
    /// Configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
