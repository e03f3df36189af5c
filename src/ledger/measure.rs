//! Performance measures fed by the ledgers.

use std::cell::RefCell;
use std::rc::Rc;

use crate::job::ClassId;

/// Sink for observed samples.
///
/// Ledgers push samples into registered measures as jobs move; unregistered metrics cost nothing.
pub trait Measure {
    /// Records a sample with the given weight.
    fn update(&mut self, sample: f64, weight: f64);
}

/// A measure shared between a ledger and its reader.
pub type SharedMeasure = Rc<RefCell<dyn Measure>>;

/// Quantity observed by a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Number of resident jobs, weighted by the time it persisted.
    QueueLength,
    /// Time from arrival to departure.
    ResponseTime,
    /// Time spent at the station over a visit.
    ResidenceTime,
    /// Resident jobs per server, weighted by time.
    Utilization,
    /// Time between departures.
    Throughput,
    /// Time between drops.
    DropRate,
    /// Time between reneges.
    RenegingRate,
    /// Time between balks.
    BalkingRate,
    /// Time between retrial attempts.
    RetrialAttemptsRate,
    /// Jobs in the retrial orbit, weighted by time.
    RetrialOrbitSize,
    /// Time from entering the network (or first orbit entry) to admission.
    WaitingTime,
}

impl Metric {
    /// All metrics in index order.
    pub const ALL: [Metric; 11] = [
        Metric::QueueLength,
        Metric::ResponseTime,
        Metric::ResidenceTime,
        Metric::Utilization,
        Metric::Throughput,
        Metric::DropRate,
        Metric::RenegingRate,
        Metric::BalkingRate,
        Metric::RetrialAttemptsRate,
        Metric::RetrialOrbitSize,
        Metric::WaitingTime,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Time-weighted (or sample-weighted) mean with min and max tracking.
#[derive(Clone, Debug, Default)]
pub struct WeightedMean {
    weighted_sum: f64,
    total_weight: f64,
    samples: u64,
    min: Option<f64>,
    max: Option<f64>,
}

impl WeightedMean {
    /// Creates an empty measure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a new measure for registration in a ledger.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Returns the weighted mean, or `None` before the first positively weighted sample.
    pub fn mean(&self) -> Option<f64> {
        if self.total_weight > 0. {
            Some(self.weighted_sum / self.total_weight)
        } else {
            None
        }
    }

    /// Number of samples recorded.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Sum of weights.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Smallest sample.
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Largest sample.
    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

impl Measure for WeightedMean {
    fn update(&mut self, sample: f64, weight: f64) {
        if weight < 0. {
            return;
        }
        self.samples += 1;
        self.weighted_sum += sample * weight;
        self.total_weight += weight;
        self.min = Some(self.min.map_or(sample, |m| m.min(sample)));
        self.max = Some(self.max.map_or(sample, |m| m.max(sample)));
    }
}

/// Rate estimator fed with inter-event times. The rate is the inverse of their mean.
#[derive(Clone, Debug, Default)]
pub struct InverseMean {
    inner: WeightedMean,
}

impl InverseMean {
    /// Creates an empty estimator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a new estimator for registration in a ledger.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Events per time unit, or `None` until an interval of positive length was observed.
    pub fn rate(&self) -> Option<f64> {
        self.inner.mean().filter(|m| *m > 0.).map(|m| 1. / m)
    }

    /// Number of intervals recorded.
    pub fn samples(&self) -> u64 {
        self.inner.samples()
    }
}

impl Measure for InverseMean {
    fn update(&mut self, sample: f64, weight: f64) {
        self.inner.update(sample, weight);
    }
}

/// Keeps every sample. Handy for inspecting exact values in small runs.
#[derive(Clone, Debug, Default)]
pub struct SampleLog {
    samples: Vec<(f64, f64)>,
}

impl SampleLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a new log for registration in a ledger.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Recorded `(sample, weight)` pairs in arrival order.
    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    /// Recorded sample values in arrival order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|(v, _)| *v).collect()
    }
}

impl Measure for SampleLog {
    fn update(&mut self, sample: f64, weight: f64) {
        self.samples.push((sample, weight));
    }
}

/// Registered measures of one ledger, per metric for the aggregate and for every class.
pub(crate) struct Observers {
    classes: usize,
    slots: Vec<Option<SharedMeasure>>,
}

impl Observers {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            slots: vec![None; Metric::ALL.len() * (classes + 1)],
        }
    }

    fn slot(&self, metric: Metric, class: Option<ClassId>) -> usize {
        metric.index() * (self.classes + 1) + class.map_or(0, |c| c + 1)
    }

    pub fn register(&mut self, metric: Metric, class: Option<ClassId>, measure: SharedMeasure) {
        let slot = self.slot(metric, class);
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(measure);
        }
    }

    /// Feeds the sample to the per-class and the aggregate measure.
    pub fn update(&self, metric: Metric, class: ClassId, sample: f64, weight: f64) {
        self.update_one(metric, Some(class), sample, weight);
        self.update_one(metric, None, sample, weight);
    }

    pub fn update_one(&self, metric: Metric, class: Option<ClassId>, sample: f64, weight: f64) {
        if let Some(Some(measure)) = self.slots.get(self.slot(metric, class)) {
            measure.borrow_mut().update(sample, weight);
        }
    }
}
