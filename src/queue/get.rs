//! Selection of the next buffered job handed to the server.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::job::ClassId;
use crate::ledger::{JobInfo, JobInfoList, TrackedJob, TrackingId};

/// How a polling server serves the class it is visiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollingDiscipline {
    /// Serve the class until it is empty, including jobs arriving during the visit.
    Exhaustive,
    /// Serve only the jobs present when the visit started.
    Gated,
    /// Serve at most `k` jobs per visit.
    Limited {
        /// Per-visit limit.
        k: usize,
    },
}

/// Buffer selection rule of a queue.
#[derive(Clone, Debug)]
pub enum GetStrategy {
    /// Head of the buffer.
    Fcfs,
    /// Class-by-class service for a polling server.
    Polling(PollingGetStrategy),
}

impl GetStrategy {
    /// Returns `true` for polling strategies.
    pub fn is_polling(&self) -> bool {
        matches!(self, GetStrategy::Polling(_))
    }

    /// Removes and returns the next job to serve.
    ///
    /// A polling strategy returns `None` when the current visit is over, meaning that a switchover is due.
    pub fn select_next(&mut self, buffer: &mut JobInfoList, now: f64) -> Option<JobInfo> {
        match self {
            GetStrategy::Fcfs => buffer.remove_first(now),
            GetStrategy::Polling(polling) => polling.select_next(buffer, now),
        }
    }

    /// Returns the job [`select_next`](Self::select_next) would take if the current visit continues.
    pub fn peek_next<'a>(&self, buffer: &'a JobInfoList) -> Option<&'a JobInfo> {
        match self {
            GetStrategy::Fcfs => buffer.first(),
            GetStrategy::Polling(polling) => polling.peek_next(buffer),
        }
    }
}

/// Per-visit state of a polling get strategy.
#[derive(Clone, Debug)]
pub struct PollingGetStrategy {
    discipline: PollingDiscipline,
    zero_switchover: Vec<bool>,
    current: ClassId,
    gate: Option<VecDeque<TrackingId>>,
    served: usize,
}

impl PollingGetStrategy {
    /// Creates the strategy. `zero_switchover[c]` tells whether switching to class `c` costs nothing;
    /// visits to such classes are chained without asking the server to switch.
    pub fn new(discipline: PollingDiscipline, zero_switchover: Vec<bool>) -> Self {
        Self {
            discipline,
            zero_switchover,
            current: 0,
            gate: None,
            served: 0,
        }
    }

    /// Discipline of the strategy.
    pub fn discipline(&self) -> PollingDiscipline {
        self.discipline
    }

    /// Class currently visited.
    pub fn current_class(&self) -> ClassId {
        self.current
    }

    fn classes(&self) -> usize {
        self.zero_switchover.len().max(1)
    }

    fn advance(&mut self) {
        self.current = (self.current + 1) % self.classes();
        self.gate = None;
        self.served = 0;
    }

    fn next_in_visit(&mut self, buffer: &mut JobInfoList, now: f64) -> Option<JobInfo> {
        let class = self.current;
        let next = match self.discipline {
            PollingDiscipline::Exhaustive => buffer.remove_first_of(class, now),
            PollingDiscipline::Gated => {
                let gate = self
                    .gate
                    .get_or_insert_with(|| buffer.tracking_ids_of(class).collect());
                let mut next = None;
                while let Some(id) = gate.pop_front() {
                    if let Some(info) = buffer.remove_tracked(id, now) {
                        next = Some(info);
                        break;
                    }
                }
                next
            }
            PollingDiscipline::Limited { k } => {
                if self.served < k {
                    let next = buffer.remove_first_of(class, now);
                    if next.is_some() {
                        self.served += 1;
                    }
                    next
                } else {
                    None
                }
            }
        };
        if next.is_none() {
            self.advance();
        }
        next
    }

    /// Removes and returns the next job of the visit.
    ///
    /// When the visit ends the strategy moves on to the next class. Classes reached at zero switchover cost are
    /// visited right away, at most one full cycle.
    pub fn select_next(&mut self, buffer: &mut JobInfoList, now: f64) -> Option<JobInfo> {
        let mut next = self.next_in_visit(buffer, now);
        for _ in 0..self.classes() {
            if next.is_some() || !self.zero_switchover.get(self.current).copied().unwrap_or(false) {
                break;
            }
            next = self.next_in_visit(buffer, now);
        }
        next
    }

    /// Job the current visit would serve next.
    pub fn peek_next<'a>(&self, buffer: &'a JobInfoList) -> Option<&'a JobInfo> {
        let class = self.current;
        match self.discipline {
            PollingDiscipline::Exhaustive => buffer.first_of(class),
            PollingDiscipline::Gated => match &self.gate {
                Some(gate) => gate
                    .iter()
                    .find_map(|id| buffer.iter().find(|e| e.tracking_id() == *id)),
                None => buffer.first_of(class),
            },
            PollingDiscipline::Limited { k } => {
                if self.served < k {
                    buffer.first_of(class)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::job::{Job, JobClass, JobId};

    use super::*;

    fn buffer_with(jobs: &[(JobId, ClassId)]) -> (JobInfoList, Vec<Rc<JobClass>>) {
        let classes = vec![Rc::new(JobClass::open(0, "a")), Rc::new(JobClass::open(1, "b"))];
        let mut buffer = JobInfoList::new(2);
        for (id, class) in jobs {
            buffer.add(JobInfo::new(Job::new(*id, classes[*class].clone(), 0.), 0.), 0.);
        }
        (buffer, classes)
    }

    fn push(buffer: &mut JobInfoList, classes: &[Rc<JobClass>], id: JobId, class: ClassId) {
        buffer.add(JobInfo::new(Job::new(id, classes[class].clone(), 0.), 0.), 0.);
    }

    fn take(strategy: &mut PollingGetStrategy, buffer: &mut JobInfoList) -> Option<JobId> {
        strategy.select_next(buffer, 0.).map(|e| e.job_id())
    }

    #[test]
    fn exhaustive_serves_arrivals_during_visit() {
        let (mut buffer, classes) = buffer_with(&[(1, 0), (2, 1), (3, 0)]);
        let mut s = PollingGetStrategy::new(PollingDiscipline::Exhaustive, vec![false, false]);
        assert_eq!(take(&mut s, &mut buffer), Some(1));
        push(&mut buffer, &classes, 4, 0);
        assert_eq!(take(&mut s, &mut buffer), Some(3));
        assert_eq!(take(&mut s, &mut buffer), Some(4));
        assert_eq!(take(&mut s, &mut buffer), None);
        assert_eq!(s.current_class(), 1);
        assert_eq!(take(&mut s, &mut buffer), Some(2));
    }

    #[test]
    fn gated_ignores_arrivals_during_visit() {
        let (mut buffer, classes) = buffer_with(&[(1, 0), (2, 0)]);
        let mut s = PollingGetStrategy::new(PollingDiscipline::Gated, vec![false, false]);
        assert_eq!(take(&mut s, &mut buffer), Some(1));
        push(&mut buffer, &classes, 3, 0);
        assert_eq!(take(&mut s, &mut buffer), Some(2));
        assert_eq!(take(&mut s, &mut buffer), None);
        assert_eq!(buffer.size_of(0), 1);
    }

    #[test]
    fn limited_stops_after_k() {
        let (mut buffer, _) = buffer_with(&[(1, 0), (2, 0), (3, 0)]);
        let mut s = PollingGetStrategy::new(PollingDiscipline::Limited { k: 2 }, vec![false, false]);
        assert_eq!(take(&mut s, &mut buffer), Some(1));
        assert_eq!(take(&mut s, &mut buffer), Some(2));
        assert_eq!(take(&mut s, &mut buffer), None);
        assert_eq!(s.current_class(), 1);
    }

    #[test]
    fn zero_cost_classes_are_chained() {
        let (mut buffer, _) = buffer_with(&[(1, 1)]);
        let mut s = PollingGetStrategy::new(PollingDiscipline::Exhaustive, vec![false, true]);
        assert_eq!(take(&mut s, &mut buffer), Some(1));
        assert_eq!(s.current_class(), 1);
    }
}
