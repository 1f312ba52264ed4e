//! Run configuration for the refinement engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::{DiseaseProbabilityModel, SamplingPolicy};
use crate::error::{RefinerError, RefinerResult};
use crate::refinement::RefinementStrategy;

/// Strategy selector as written on the command line or in a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    #[default]
    Score,
    Rank,
    DdScore,
    KsTest,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Score => write!(f, "score"),
            StrategyKind::Rank => write!(f, "rank"),
            StrategyKind::DdScore => write!(f, "ddScore"),
            StrategyKind::KsTest => write!(f, "ksTest"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "score" => Ok(StrategyKind::Score),
            "rank" => Ok(StrategyKind::Rank),
            "ddscore" => Ok(StrategyKind::DdScore),
            "kstest" => Ok(StrategyKind::KsTest),
            other => Err(format!(
                "unknown strategy '{other}', expected one of score, rank, ddScore, ksTest"
            )),
        }
    }
}

/// Complete configuration of one refinement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefinementConfig {
    pub strategy: StrategyKind,
    /// Repetitions simulated per diagnostic test
    pub repetitions: usize,
    pub sampling: SamplingPolicy,
    /// Weight of the probability term in the `score` strategy blend
    pub weight: f64,
    /// Upper bound on concurrently running repetitions
    pub workers: usize,
    /// Failure ratio above which a test is marked unreliable
    pub failure_threshold: f64,
    /// Successful repetitions a strategy needs before it reports a utility
    pub min_samples: usize,
    pub seed: u64,
    /// Overall run timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Frequency assumed for annotations that carry none
    pub default_frequency: f64,
    pub probability_model: DiseaseProbabilityModel,
    /// Number of top baseline diseases used as targets when none are given
    pub n_diseases: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            repetitions: 10,
            sampling: SamplingPolicy::default(),
            weight: 0.5,
            workers: default_workers(),
            failure_threshold: 0.3,
            min_samples: 2,
            seed: 42,
            timeout_secs: None,
            default_frequency: 1.0,
            probability_model: DiseaseProbabilityModel::default(),
            n_diseases: 10,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn unit_interval(field: &str, value: f64) -> RefinerResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RefinerError::config(field, format!("{value} is outside [0, 1]")))
    }
}

impl RefinementConfig {
    /// Reject values no run could use; called before any work is scheduled
    pub fn validate(&self) -> RefinerResult<()> {
        if self.repetitions == 0 {
            return Err(RefinerError::config("repetitions", "must be at least 1"));
        }
        if self.workers == 0 {
            return Err(RefinerError::config("workers", "must be at least 1"));
        }
        if self.n_diseases == 0 {
            return Err(RefinerError::config("n_diseases", "must be at least 1"));
        }
        unit_interval("weight", self.weight)?;
        unit_interval("failure_threshold", self.failure_threshold)?;
        unit_interval("default_frequency", self.default_frequency)?;
        if let DiseaseProbabilityModel::ExponentialDecay { lambda } = self.probability_model {
            if !(lambda.is_finite() && lambda > 0.0) {
                return Err(RefinerError::config(
                    "lambda",
                    format!("{lambda} must be a positive number"),
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(RefinerError::config("timeout", "must be at least one second"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The strategy value the orchestrator dispatches on
    pub fn refinement_strategy(&self) -> RefinementStrategy {
        match self.strategy {
            StrategyKind::Score => RefinementStrategy::Score {
                weight: self.weight,
            },
            StrategyKind::Rank => RefinementStrategy::Rank,
            StrategyKind::DdScore => RefinementStrategy::DdScore,
            StrategyKind::KsTest => RefinementStrategy::KsTest,
        }
    }
}
