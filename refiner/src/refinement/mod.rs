//! Refinement strategies turning repeated oracle runs into one utility per test
//!
//! Every strategy consumes the same inputs: the successful [`RunOutcome`]s of
//! one diagnostic test, the baseline ranking and the target diseases. The
//! active strategy is a plain enum value chosen at configuration time.

pub mod strategies;
pub mod types;

use serde::{Deserialize, Serialize};
use shared::{stage_debug, DiseaseId, OracleResult, RankedPosition, Stage};
use std::collections::BTreeMap;
use std::fmt;

pub use types::*;

/// Inputs every strategy shares besides the outcomes themselves
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub baseline: &'a OracleResult,
    pub targets: &'a [DiseaseId],
    /// Fewer successful outcomes than this yields an insufficient-data score
    pub min_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RefinementStrategy {
    /// Weighted blend of target probability mass and likelihood-ratio gains over competitors
    Score { weight: f64 },
    /// Average rank improvement of the targets
    Rank,
    /// Average posttest probability change of the targets
    DdScore,
    /// Kolmogorov-Smirnov distance between baseline and post-test target probabilities
    KsTest,
}

impl fmt::Display for RefinementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score { weight } => write!(f, "score(weight={weight})"),
            Self::Rank => write!(f, "rank"),
            Self::DdScore => write!(f, "ddScore"),
            Self::KsTest => write!(f, "ksTest"),
        }
    }
}

impl RefinementStrategy {
    /// Reduce the outcomes of one test to a utility
    ///
    /// Never divides by zero: too few outcomes, or outcomes in which no
    /// target can be compared, give [`StrategyScore::insufficient`].
    pub fn score(&self, outcomes: &[RunOutcome], ctx: &ScoringContext<'_>) -> StrategyScore {
        if outcomes.len() < ctx.min_samples.max(1) {
            stage_debug!(
                Stage::Refinement,
                outcomes = outcomes.len(),
                min_samples = ctx.min_samples,
                "Too few outcomes to score"
            );
            return StrategyScore::insufficient();
        }
        let score = match self {
            Self::Score { weight } => strategies::score::utility(outcomes, ctx, *weight),
            Self::Rank => strategies::rank::utility(outcomes, ctx),
            Self::DdScore => strategies::dd_score::utility(outcomes, ctx),
            Self::KsTest => strategies::ks_test::utility(outcomes, ctx),
        };
        if score.utility.is_finite() {
            score
        } else {
            stage_debug!(Stage::Refinement, strategy = %self, "Non-finite utility; treating as insufficient");
            StrategyScore::insufficient()
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Average a per-target delta, first over outcomes and then over targets
///
/// A target missing from the baseline or from an outcome's result is not
/// ranked there and contributes nothing for that outcome. Samples hold the
/// mean delta across targets of each outcome.
pub(crate) fn averaged_target_deltas<F>(
    outcomes: &[RunOutcome],
    ctx: &ScoringContext<'_>,
    delta: F,
) -> StrategyScore
where
    F: Fn(&RankedPosition, &RankedPosition) -> f64,
{
    let mut per_target: BTreeMap<&DiseaseId, Vec<f64>> = BTreeMap::new();
    let mut samples = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        let mut outcome_deltas = Vec::with_capacity(ctx.targets.len());
        for target in ctx.targets {
            let (Some(before), Some(after)) = (ctx.baseline.position_of(target), outcome.position(target))
            else {
                continue;
            };
            let d = delta(&before, &after);
            per_target.entry(target).or_default().push(d);
            outcome_deltas.push(d);
        }
        if let Some(m) = mean(&outcome_deltas) {
            samples.push(m);
        }
    }

    let target_means: Vec<f64> = per_target.values().filter_map(|v| mean(v)).collect();
    match mean(&target_means) {
        Some(utility) => StrategyScore::new(utility, samples),
        None => StrategyScore::insufficient(),
    }
}
