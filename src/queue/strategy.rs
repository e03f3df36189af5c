//! Buffer insertion and full-buffer policies.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ledger::{JobInfo, JobInfoList, TrackedJob};

/// Where an admitted job is inserted in the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PutStrategy {
    /// First come, first served.
    #[default]
    Tail,
    /// Last come, first served.
    Head,
    /// Last come, first served with preemption: the job goes straight to the server.
    LcfsPreemptive,
    /// Behind every job of the same or higher priority.
    Priority,
}

impl PutStrategy {
    /// Returns `true` if admitted jobs bypass the buffer and may evict a job in service.
    pub fn is_preemptive(self) -> bool {
        self == PutStrategy::LcfsPreemptive
    }

    /// Inserts the record into the buffer.
    pub fn put(self, info: JobInfo, buffer: &mut JobInfoList, now: f64) {
        match self {
            PutStrategy::Tail => buffer.add(info, now),
            PutStrategy::Head | PutStrategy::LcfsPreemptive => buffer.add_first(info, now),
            PutStrategy::Priority => {
                let priority = info.job().priority();
                let index = buffer
                    .iter()
                    .position(|e| e.job().priority() < priority)
                    .unwrap_or(buffer.size());
                buffer.insert(index, info, now);
            }
        }
    }
}

/// What happens to a job arriving at a full buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DropPolicy {
    /// The job is lost.
    #[default]
    Drop,
    /// Blocking after service: the job waits and its sender is held until it is admitted.
    Block,
    /// The job waits in a side queue; its sender is released at once.
    WaitingQueue,
    /// The job leaves and tries again after a random delay.
    Retrial,
}

impl FromStr for DropPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(DropPolicy::Drop),
            "block" | "bas blocking" => Ok(DropPolicy::Block),
            "waiting queue" | "waiting_queue" => Ok(DropPolicy::WaitingQueue),
            "retrial" => Ok(DropPolicy::Retrial),
            _ => Err(ConfigError::UnknownDropPolicy(s.to_owned())),
        }
    }
}

impl TryFrom<String> for DropPolicy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DropPolicy> for String {
    fn from(policy: DropPolicy) -> Self {
        match policy {
            DropPolicy::Drop => "drop",
            DropPolicy::Block => "BAS blocking",
            DropPolicy::WaitingQueue => "waiting queue",
            DropPolicy::Retrial => "retrial",
        }
        .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::job::{Job, JobClass};

    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!("drop".parse::<DropPolicy>().unwrap(), DropPolicy::Drop);
        assert_eq!("BAS blocking".parse::<DropPolicy>().unwrap(), DropPolicy::Block);
        assert_eq!("block".parse::<DropPolicy>().unwrap(), DropPolicy::Block);
        assert_eq!("waiting queue".parse::<DropPolicy>().unwrap(), DropPolicy::WaitingQueue);
        assert_eq!("Retrial".parse::<DropPolicy>().unwrap(), DropPolicy::Retrial);
        assert!(matches!(
            "bounce".parse::<DropPolicy>(),
            Err(ConfigError::UnknownDropPolicy(name)) if name == "bounce"
        ));
        let policies: Vec<DropPolicy> = serde_json::from_str(r#"["drop", "waiting queue"]"#).unwrap();
        assert_eq!(policies, vec![DropPolicy::Drop, DropPolicy::WaitingQueue]);
    }

    #[test]
    fn priority_put_keeps_fifo_within_priority() {
        let low = Rc::new(JobClass::open(0, "low"));
        let high = Rc::new(JobClass::open(1, "high").with_priority(5));
        let mut buffer: JobInfoList = JobInfoList::new(2);
        let jobs = [(1, &low), (2, &high), (3, &low), (4, &high)];
        for (id, class) in jobs {
            let info = JobInfo::new(Job::new(id, class.clone(), 0.), 0.);
            PutStrategy::Priority.put(info, &mut buffer, 0.);
        }
        let order: Vec<u64> = buffer.iter().map(|e| e.job_id()).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn head_put_is_lifo() {
        let class = Rc::new(JobClass::open(0, "a"));
        let mut buffer: JobInfoList = JobInfoList::new(1);
        for id in 1..=3 {
            PutStrategy::Head.put(JobInfo::new(Job::new(id, class.clone(), 0.), 0.), &mut buffer, 0.);
        }
        assert_eq!(buffer.first().map(|e| e.job_id()), Some(3));
    }
}
