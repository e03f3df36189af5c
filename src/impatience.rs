//! Balking, reneging and retrial behaviour of impatient jobs.

use serde::{Deserialize, Serialize};

use crate::context::SimulationContext;
use crate::distribution::{Distribution, Sampler};
use crate::error::ConfigError;
use crate::job::ClassId;

/// Balking probability for an inclusive range of observed queue lengths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalkingRange {
    /// Smallest queue length of the range.
    pub from: usize,
    /// Largest queue length of the range, `None` for unbounded.
    #[serde(default)]
    pub to: Option<usize>,
    /// Probability to balk.
    pub probability: f64,
}

impl BalkingRange {
    fn contains(&self, length: usize) -> bool {
        length >= self.from && self.to.map_or(true, |to| length <= to)
    }
}

/// Impatience of one class as written in a configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImpatienceConfig {
    /// Patient jobs.
    #[default]
    None,
    /// Jobs may refuse to join depending on the queue length they observe.
    Balking {
        /// Non-overlapping ranges, sorted by `from`.
        ranges: Vec<BalkingRange>,
    },
    /// Jobs abandon the buffer after a random delay.
    Reneging {
        /// Patience distribution.
        delay: Distribution,
    },
    /// Jobs finding the buffer full retry after a random delay.
    Retrial {
        /// Delay between attempts.
        delay: Distribution,
    },
}

/// Impatience capability of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpatienceType {
    /// Patient.
    None,
    /// Balking.
    Balking,
    /// Reneging.
    Reneging,
    /// Retrial.
    Retrial,
}

/// Balking parameters.
#[derive(Clone, Debug)]
pub struct Balking {
    ranges: Vec<BalkingRange>,
    priority_aware: bool,
}

impl Balking {
    /// Probability to balk at the observed queue length. Lengths outside every range never balk.
    pub fn probability(&self, queue_length: usize) -> f64 {
        self.ranges
            .iter()
            .find(|r| r.contains(queue_length))
            .map_or(0., |r| r.probability)
    }

    /// Decides whether a job observing `queue_length` refuses to join. An empty queue is always joined.
    pub fn will_balk(&self, queue_length: usize, ctx: &SimulationContext) -> bool {
        if queue_length == 0 {
            return false;
        }
        let p = self.probability(queue_length);
        p >= 1. || (p > 0. && ctx.rand() < p)
    }

    /// Whether only jobs of the same or higher priority count towards the observed queue length.
    pub fn is_priority_aware(&self) -> bool {
        self.priority_aware
    }
}

/// Validated impatience of a class.
#[derive(Clone, Debug)]
pub enum Impatience {
    /// Patient.
    None,
    /// Balking.
    Balking(Balking),
    /// Reneging with the patience distribution.
    Reneging(Sampler),
    /// Retrial with the delay distribution.
    Retrial(Sampler),
}

impl Impatience {
    /// Validates the configuration of `class`.
    ///
    /// `priority_aware` enables priority-aware balking and is set when the class is buffered by priority.
    pub fn from_config(class: ClassId, config: &ImpatienceConfig, priority_aware: bool) -> Result<Self, ConfigError> {
        Ok(match config {
            ImpatienceConfig::None => Impatience::None,
            ImpatienceConfig::Balking { ranges } => {
                validate_ranges(class, ranges)?;
                Impatience::Balking(Balking {
                    ranges: ranges.clone(),
                    priority_aware,
                })
            }
            ImpatienceConfig::Reneging { delay } => Impatience::Reneging(delay.sampler()?),
            ImpatienceConfig::Retrial { delay } => Impatience::Retrial(delay.sampler()?),
        })
    }

    /// Capability of this impatience.
    pub fn kind(&self) -> ImpatienceType {
        match self {
            Impatience::None => ImpatienceType::None,
            Impatience::Balking(_) => ImpatienceType::Balking,
            Impatience::Reneging(_) => ImpatienceType::Reneging,
            Impatience::Retrial(_) => ImpatienceType::Retrial,
        }
    }

    /// Returns `true` if the impatience is of the given type.
    pub fn is(&self, kind: ImpatienceType) -> bool {
        self.kind() == kind
    }

    /// Draws a reneging or retrial delay. Other kinds have none.
    pub fn generate_delay(&self, ctx: &SimulationContext) -> Option<f64> {
        match self {
            Impatience::Reneging(sampler) | Impatience::Retrial(sampler) => Some(sampler.sample(ctx)),
            _ => None,
        }
    }

    /// Balking parameters, if the class balks.
    pub fn balking(&self) -> Option<&Balking> {
        match self {
            Impatience::Balking(balking) => Some(balking),
            _ => None,
        }
    }
}

fn validate_ranges(class: ClassId, ranges: &[BalkingRange]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBalking { class, reason };
    let mut previous_end: Option<Option<usize>> = None;
    for range in ranges {
        if !(0. ..=1.).contains(&range.probability) {
            return Err(invalid(format!("probability {} is outside [0, 1]", range.probability)));
        }
        if range.to.is_some_and(|to| to < range.from) {
            return Err(invalid(format!("range starting at {} ends before it starts", range.from)));
        }
        match previous_end {
            Some(None) => return Err(invalid("a range follows an unbounded one".to_string())),
            Some(Some(end)) if range.from <= end => {
                return Err(invalid(format!("range starting at {} overlaps the previous one", range.from)))
            }
            _ => {}
        }
        previous_end = Some(range.to);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Simulation;

    use super::*;

    fn range(from: usize, to: Option<usize>, probability: f64) -> BalkingRange {
        BalkingRange { from, to, probability }
    }

    #[test]
    fn balking_probability_by_range() {
        let config = ImpatienceConfig::Balking {
            ranges: vec![range(1, Some(2), 0.), range(3, None, 1.)],
        };
        let impatience = Impatience::from_config(0, &config, false).unwrap();
        let balking = impatience.balking().unwrap();
        assert_eq!(balking.probability(2), 0.);
        assert_eq!(balking.probability(10), 1.);

        let mut sim = Simulation::new(1);
        let ctx = sim.create_context("probe");
        assert!(!balking.will_balk(0, &ctx));
        assert!(!balking.will_balk(2, &ctx));
        assert!(balking.will_balk(3, &ctx));
    }

    #[test]
    fn rejects_overlapping_ranges() {
        let overlapping = ImpatienceConfig::Balking {
            ranges: vec![range(1, Some(4), 0.2), range(3, None, 0.5)],
        };
        assert!(matches!(
            Impatience::from_config(2, &overlapping, false),
            Err(ConfigError::InvalidBalking { class: 2, .. })
        ));
        let bad_probability = ImpatienceConfig::Balking {
            ranges: vec![range(1, None, 1.5)],
        };
        assert!(Impatience::from_config(0, &bad_probability, false).is_err());
    }

    #[test]
    fn only_timed_kinds_have_delays() {
        let mut sim = Simulation::new(1);
        let ctx = sim.create_context("probe");
        let reneging = Impatience::from_config(
            0,
            &ImpatienceConfig::Reneging {
                delay: Distribution::deterministic(2.),
            },
            false,
        )
        .unwrap();
        assert_eq!(reneging.generate_delay(&ctx), Some(2.));
        assert!(reneging.is(ImpatienceType::Reneging));
        assert_eq!(Impatience::None.generate_delay(&ctx), None);
    }
}
