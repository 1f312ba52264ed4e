//! `ddScore`: average posttest probability change of each target

use super::super::{averaged_target_deltas, RunOutcome, ScoringContext, StrategyScore};

pub fn utility(outcomes: &[RunOutcome], ctx: &ScoringContext<'_>) -> StrategyScore {
    averaged_target_deltas(outcomes, ctx, |before, after| {
        after.posttest_probability - before.posttest_probability
    })
}
