//! `score`: blend of absolute certainty and relative ranking gains
//!
//! The blend of a ranking is
//! `w * sum(p(t)) + (1 - w) * sum(LR(t) / LR(c))`, with `t` over the targets
//! and `c` over the competitors ranked above `t` in the baseline. A test's
//! utility is the mean, over outcomes, of the blend after the test minus the
//! baseline blend. Only targets ranked in both the baseline and the outcome
//! contribute, and a ratio term only counts when both likelihood ratios are
//! usable on both sides, so an unranked disease never reads as a loss.

use shared::{DiseaseId, OracleResult, RankedPosition};

use super::super::{mean, RunOutcome, ScoringContext, StrategyScore};

pub fn utility(outcomes: &[RunOutcome], ctx: &ScoringContext<'_>, weight: f64) -> StrategyScore {
    let samples: Vec<f64> = outcomes
        .iter()
        .filter_map(|o| outcome_delta(&o.result, ctx, weight))
        .filter(|delta| delta.is_finite())
        .collect();

    match mean(&samples) {
        Some(delta) if delta.is_finite() => StrategyScore::new(delta, samples),
        _ => StrategyScore::insufficient(),
    }
}

/// Blend change of one outcome, summed over the targets it can be compared on
///
/// `None` when no target is ranked in both the baseline and `post`.
pub fn outcome_delta(post: &OracleResult, ctx: &ScoringContext<'_>, weight: f64) -> Option<f64> {
    let deltas: Vec<f64> = ctx
        .targets
        .iter()
        .filter_map(|target| target_delta(post, target, ctx, weight))
        .collect();
    if deltas.is_empty() {
        None
    } else {
        Some(deltas.iter().sum())
    }
}

fn target_delta(post: &OracleResult, target: &DiseaseId, ctx: &ScoringContext<'_>, weight: f64) -> Option<f64> {
    let before = ctx.baseline.position_of(target)?;
    let after = post.position_of(target)?;
    let probability_gain = after.posttest_probability - before.posttest_probability;

    let mut ratio_gain = 0.0;
    if usable_lr(&before) && usable_lr(&after) {
        for competitor in ctx.baseline.ranked_above(target) {
            let Some(competitor_after) = post.position_of(&competitor.disease_id) else {
                continue;
            };
            let competitor_before = competitor.likelihood_ratio;
            if usable(competitor_before) && usable_lr(&competitor_after) {
                ratio_gain += after.likelihood_ratio / competitor_after.likelihood_ratio
                    - before.likelihood_ratio / competitor_before;
            }
        }
    }

    Some(weight * probability_gain + (1.0 - weight) * ratio_gain)
}

fn usable_lr(position: &RankedPosition) -> bool {
    usable(position.likelihood_ratio)
}

fn usable(lr: f64) -> bool {
    lr > 0.0 && lr.is_finite()
}
