//! Station configuration.
//!
//! Configurations are plain serde structures so they can be read from JSON. Per-class lists may be left empty
//! to use the default for every class, otherwise they must have exactly one entry per class. Everything is
//! checked when a station is built.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::distribution::{Distribution, Sampler};
use crate::error::ConfigError;
use crate::impatience::{Impatience, ImpatienceConfig};
use crate::job::JobClass;
use crate::queue::{DropPolicy, GetStrategy, PollingDiscipline, PollingGetStrategy, PutStrategy, QueueSettings};
use crate::service::{PollingServer, PsServer, PsStrategy, Server, ServiceSection};

fn unlimited() -> i64 {
    -1
}

fn one() -> usize {
    1
}

/// Configuration of a station.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station name, also the simulation component name.
    pub name: String,
    /// Input section.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Service section.
    pub service: ServiceConfig,
    /// Impatience of every class.
    #[serde(default)]
    pub impatience: Vec<ImpatienceConfig>,
    /// Jobs of every class present in the buffer at time zero.
    #[serde(default)]
    pub preload: Vec<usize>,
}

/// Configuration of the input section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Station capacity including jobs in service, -1 for infinite.
    #[serde(default = "unlimited")]
    pub size: i64,
    /// Cap on jobs in the service section, -1 for unbounded.
    #[serde(default = "unlimited")]
    pub max_running: i64,
    /// Full-buffer policy of every class.
    #[serde(default)]
    pub drop_policies: Vec<DropPolicy>,
    /// Buffer insertion rule of every class.
    #[serde(default)]
    pub put_strategies: Vec<PutStrategy>,
    /// Rule selecting the next job to serve.
    #[serde(default)]
    pub get_strategy: GetStrategyConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            size: unlimited(),
            max_running: unlimited(),
            drop_policies: Vec::new(),
            put_strategies: Vec::new(),
            get_strategy: GetStrategyConfig::default(),
        }
    }
}

/// Buffer selection rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GetStrategyConfig {
    /// Head of the buffer.
    #[default]
    Fcfs,
    /// Class-by-class service, requires a polling server.
    Polling {
        /// Per-visit discipline.
        discipline: PollingDiscipline,
    },
}

/// Configuration of the service section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceConfig {
    /// Single or multi-server.
    Server {
        /// Number of servers.
        #[serde(default = "one")]
        servers: usize,
        /// Whether a preemptive arrival may evict a job in service.
        #[serde(default)]
        preemptive: bool,
        /// Service time of every class.
        service: Vec<Distribution>,
    },
    /// Processor sharing.
    ProcessorSharing {
        /// Number of servers.
        #[serde(default = "one")]
        servers: usize,
        /// Service demand of every class.
        service: Vec<Distribution>,
        /// Weight of every class, 1 by default.
        #[serde(default)]
        weights: Vec<f64>,
        /// Sharing rule of every class, egalitarian by default.
        #[serde(default)]
        strategies: Vec<PsStrategy>,
    },
    /// Polling.
    Polling {
        /// Number of servers.
        #[serde(default = "one")]
        servers: usize,
        /// Service time of every class.
        service: Vec<Distribution>,
        /// Time to switch to every class.
        switchover: Vec<Distribution>,
    },
}

impl StationConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks the configuration against the job classes of the network.
    pub fn validate(&self, classes: &[Rc<JobClass>]) -> Result<(), ConfigError> {
        self.build(classes).map(|_| ())
    }

    pub(crate) fn build(&self, classes: &[Rc<JobClass>]) -> Result<(QueueSettings, ServiceSection), ConfigError> {
        let n = classes.len();
        if n == 0 {
            return Err(ConfigError::NoClasses);
        }
        for (index, class) in classes.iter().enumerate() {
            if class.id != index {
                return Err(ConfigError::ClassIdMismatch { index, id: class.id });
            }
        }

        let size = match self.queue.size {
            -1 => None,
            s if s >= 0 => Some(s as usize),
            s => return Err(ConfigError::InvalidQueueSize(s)),
        };
        let max_running = match self.queue.max_running {
            -1 => None,
            m if m > 0 => Some(m as usize),
            m => return Err(ConfigError::InvalidMaxRunning(m)),
        };
        let drop_policies = per_class("drop_policies", &self.queue.drop_policies, DropPolicy::default(), n)?;
        let put_strategies = per_class("put_strategies", &self.queue.put_strategies, PutStrategy::default(), n)?;
        let impatience = per_class("impatience", &self.impatience, ImpatienceConfig::None, n)?
            .iter()
            .enumerate()
            .map(|(c, cfg)| Impatience::from_config(c, cfg, put_strategies[c] == PutStrategy::Priority))
            .collect::<Result<Vec<_>, _>>()?;
        for (class, policy) in drop_policies.iter().enumerate() {
            if *policy == DropPolicy::Retrial && !matches!(impatience[class], Impatience::Retrial(_)) {
                return Err(ConfigError::MissingRetrialDelay { class });
            }
        }

        let preload = per_class("preload", &self.preload, 0, n)?;
        let preloaded: usize = preload.iter().sum();
        if let Some(size) = size {
            if preloaded > size {
                return Err(ConfigError::InvalidPreload(format!(
                    "{} jobs do not fit a station of size {}",
                    preloaded, size
                )));
            }
        }

        let service = self.service.build(n)?;
        let preemptive_server = matches!(self.service, ServiceConfig::Server { preemptive: true, .. });
        if let Some(class) = put_strategies.iter().position(|p| p.is_preemptive()) {
            if !preemptive_server {
                return Err(ConfigError::PreemptionMismatch { class });
            }
        }
        let get_strategy = match (self.queue.get_strategy, &service) {
            (GetStrategyConfig::Fcfs, ServiceSection::Polling(_)) => return Err(ConfigError::PollingMismatch),
            (GetStrategyConfig::Fcfs, _) => GetStrategy::Fcfs,
            (GetStrategyConfig::Polling { discipline }, ServiceSection::Polling(_)) => {
                if discipline == (PollingDiscipline::Limited { k: 0 }) {
                    return Err(ConfigError::InvalidPollingLimit);
                }
                let zero_switchover = self.service.switchover_samplers(n)?.iter().map(Sampler::is_zero).collect();
                GetStrategy::Polling(PollingGetStrategy::new(discipline, zero_switchover))
            }
            (GetStrategyConfig::Polling { .. }, _) => return Err(ConfigError::PollingMismatch),
        };

        let settings = QueueSettings {
            size,
            max_running,
            drop_policies,
            put_strategies,
            impatience,
            get_strategy,
        };
        Ok((settings, service))
    }
}

impl ServiceConfig {
    fn servers(&self) -> usize {
        match self {
            ServiceConfig::Server { servers, .. }
            | ServiceConfig::ProcessorSharing { servers, .. }
            | ServiceConfig::Polling { servers, .. } => *servers,
        }
    }

    fn switchover_samplers(&self, n: usize) -> Result<Vec<Sampler>, ConfigError> {
        match self {
            ServiceConfig::Polling { switchover, .. } => samplers("switchover", switchover, n),
            _ => Ok(Vec::new()),
        }
    }

    fn build(&self, n: usize) -> Result<ServiceSection, ConfigError> {
        let servers = self.servers();
        if servers == 0 {
            return Err(ConfigError::NoServers);
        }
        Ok(match self {
            ServiceConfig::Server {
                preemptive, service, ..
            } => ServiceSection::Server(Server::new(servers, *preemptive, samplers("service", service, n)?)),
            ServiceConfig::ProcessorSharing {
                service,
                weights,
                strategies,
                ..
            } => {
                let weights = per_class("weights", weights, 1., n)?;
                if let Some((class, weight)) = weights.iter().enumerate().find(|(_, w)| !(**w > 0. && w.is_finite())) {
                    return Err(ConfigError::InvalidWeight { class, weight: *weight });
                }
                let strategies = per_class("strategies", strategies, PsStrategy::default(), n)?;
                ServiceSection::ProcessorSharing(PsServer::new(
                    servers,
                    samplers("service", service, n)?,
                    weights,
                    strategies,
                ))
            }
            ServiceConfig::Polling { service, .. } => ServiceSection::Polling(PollingServer::new(
                servers,
                samplers("service", service, n)?,
                self.switchover_samplers(n)?,
            )),
        })
    }
}

fn per_class<T: Clone>(what: &'static str, values: &[T], default: T, n: usize) -> Result<Vec<T>, ConfigError> {
    if values.is_empty() {
        Ok(vec![default; n])
    } else if values.len() != n {
        Err(ConfigError::ClassCountMismatch {
            what,
            expected: n,
            actual: values.len(),
        })
    } else {
        Ok(values.to_vec())
    }
}

fn samplers(what: &'static str, distributions: &[Distribution], n: usize) -> Result<Vec<Sampler>, ConfigError> {
    if distributions.len() != n {
        return Err(ConfigError::ClassCountMismatch {
            what,
            expected: n,
            actual: distributions.len(),
        });
    }
    distributions.iter().map(Distribution::sampler).collect()
}
