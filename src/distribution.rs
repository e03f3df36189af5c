//! Random variates for service, switchover, arrival and impatience delays.

use rand_distr::{Exp, Gamma, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::context::SimulationContext;
use crate::error::ConfigError;

/// Declarative description of a non-negative random delay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Always zero. Used to mark zero-cost switchovers.
    Zero,
    /// Constant value.
    Deterministic {
        /// Returned value.
        value: f64,
    },
    /// Exponential with the given rate.
    Exponential {
        /// Rate (inverse mean).
        rate: f64,
    },
    /// Uniform on `[min, max]`.
    Uniform {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Sum of `shape` exponentials with the given rate.
    Erlang {
        /// Number of phases.
        shape: u32,
        /// Rate of every phase.
        rate: f64,
    },
    /// Normal, truncated at zero when sampled.
    Normal {
        /// Mean.
        mean: f64,
        /// Standard deviation.
        std_dev: f64,
    },
}

impl Distribution {
    /// Shorthand for [`Distribution::Deterministic`].
    pub fn deterministic(value: f64) -> Self {
        Self::Deterministic { value }
    }

    /// Shorthand for [`Distribution::Exponential`].
    pub fn exponential(rate: f64) -> Self {
        Self::Exponential { rate }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Deterministic { .. } => "deterministic",
            Self::Exponential { .. } => "exponential",
            Self::Uniform { .. } => "uniform",
            Self::Erlang { .. } => "erlang",
            Self::Normal { .. } => "normal",
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidDistribution {
            kind: self.kind(),
            reason: reason.into(),
        }
    }

    /// Checks the parameters and returns a sampler ready to be used during the simulation.
    pub fn sampler(&self) -> Result<Sampler, ConfigError> {
        let sampler = match *self {
            Self::Zero => Sampler::Constant(0.),
            Self::Deterministic { value } => {
                if !(value.is_finite() && value >= 0.) {
                    return Err(self.invalid(format!("value must be finite and non-negative, got {}", value)));
                }
                Sampler::Constant(value)
            }
            Self::Exponential { rate } => {
                if !(rate.is_finite() && rate > 0.) {
                    return Err(self.invalid(format!("rate must be positive, got {}", rate)));
                }
                Sampler::Exponential(Exp::new(rate).map_err(|e| self.invalid(e.to_string()))?)
            }
            Self::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite() && min >= 0. && min <= max) {
                    return Err(self.invalid(format!("need 0 <= min <= max, got [{}, {}]", min, max)));
                }
                if min == max {
                    Sampler::Constant(min)
                } else {
                    Sampler::Uniform(Uniform::new_inclusive(min, max))
                }
            }
            Self::Erlang { shape, rate } => {
                if shape == 0 || !(rate.is_finite() && rate > 0.) {
                    return Err(self.invalid(format!("need shape > 0 and rate > 0, got {} and {}", shape, rate)));
                }
                let gamma = Gamma::new(shape as f64, 1. / rate).map_err(|e| self.invalid(e.to_string()))?;
                Sampler::Erlang(gamma)
            }
            Self::Normal { mean, std_dev } => {
                if !mean.is_finite() {
                    return Err(self.invalid("mean must be finite"));
                }
                Sampler::Normal(Normal::new(mean, std_dev).map_err(|e| self.invalid(e.to_string()))?)
            }
        };
        Ok(sampler)
    }
}

/// Validated distribution that draws values from the simulation-wide generator.
#[derive(Clone, Debug)]
pub enum Sampler {
    /// Constant value, including zero.
    Constant(f64),
    /// Exponential.
    Exponential(Exp<f64>),
    /// Uniform.
    Uniform(Uniform<f64>),
    /// Erlang, as a gamma with integer shape.
    Erlang(Gamma<f64>),
    /// Normal.
    Normal(Normal<f64>),
}

impl Sampler {
    /// Draws a value. Negative draws are clamped to zero.
    pub fn sample(&self, ctx: &SimulationContext) -> f64 {
        let value = match self {
            Self::Constant(value) => *value,
            Self::Exponential(d) => ctx.sample_from_distribution(d),
            Self::Uniform(d) => ctx.sample_from_distribution(d),
            Self::Erlang(d) => ctx.sample_from_distribution(d),
            Self::Normal(d) => ctx.sample_from_distribution(d),
        };
        value.max(0.)
    }

    /// Returns `true` if every draw is zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Constant(value) if *value == 0.)
    }
}

#[cfg(test)]
mod tests {
    use crate::Simulation;

    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert!(Distribution::exponential(0.).sampler().is_err());
        assert!(Distribution::deterministic(-1.).sampler().is_err());
        assert!(Distribution::Uniform { min: 3., max: 2. }.sampler().is_err());
        assert!(Distribution::Erlang { shape: 0, rate: 1. }.sampler().is_err());
        assert!(Distribution::Normal { mean: 1., std_dev: -1. }.sampler().is_err());
    }

    #[test]
    fn samples_are_never_negative() {
        let mut sim = Simulation::new(42);
        let ctx = sim.create_context("sampler");
        let normal = Distribution::Normal { mean: -1., std_dev: 1. }.sampler().unwrap();
        for _ in 0..1000 {
            assert!(normal.sample(&ctx) >= 0.);
        }
    }

    #[test]
    fn zero_detection() {
        assert!(Distribution::Zero.sampler().unwrap().is_zero());
        assert!(Distribution::deterministic(0.).sampler().unwrap().is_zero());
        assert!(Distribution::Uniform { min: 0., max: 0. }.sampler().unwrap().is_zero());
        assert!(!Distribution::exponential(1.).sampler().unwrap().is_zero());
    }

    #[test]
    fn parses_tagged_json() {
        let d: Distribution = serde_json::from_str(r#"{"type": "erlang", "shape": 2, "rate": 0.5}"#).unwrap();
        assert_eq!(d, Distribution::Erlang { shape: 2, rate: 0.5 });
    }
}
