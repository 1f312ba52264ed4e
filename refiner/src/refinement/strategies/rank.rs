//! `rank`: pure rank improvement of the targets, ignoring probability magnitude

use shared::{DiseaseId, OracleResult};

use super::super::{averaged_target_deltas, mean, RunOutcome, ScoringContext, StrategyScore};

pub fn utility(outcomes: &[RunOutcome], ctx: &ScoringContext<'_>) -> StrategyScore {
    averaged_target_deltas(outcomes, ctx, |before, after| {
        before.rank as f64 - after.rank as f64
    })
}

/// Mean of baseline rank minus post-test rank for one disease
///
/// Positive when the disease moved up. `None` when the baseline or every
/// outcome leaves the disease unranked.
pub fn average_rank_change(
    outcomes: &[RunOutcome],
    baseline: &OracleResult,
    disease: &DiseaseId,
) -> Option<f64> {
    let before = baseline.position_of(disease)?.rank as f64;
    let changes: Vec<f64> = outcomes
        .iter()
        .filter_map(|o| o.position(disease))
        .map(|after| before - after.rank as f64)
        .collect();
    mean(&changes)
}
