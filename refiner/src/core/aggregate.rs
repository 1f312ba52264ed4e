//! Aggregator: the single owner of the final ranking table
//!
//! Per-test reductions happen here, one test at a time, after every
//! repetition of that test has returned or been abandoned.

use shared::{logging, stage_debug, stage_warn, DiseaseId, OracleResult, Stage, TermId};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::distribution::cdf_points;
use super::index::AnnotationIndex;
use crate::refinement::strategies::rank::average_rank_change;
use crate::refinement::{
    RefinementReport, RefinementStrategy, RepetitionStats, RunOutcome, ScoreStatus, ScoringContext,
    SkipReason, SkippedTest, TestUtilityScore,
};

/// How often each phenotype term was revealed across the outcomes
pub fn reveal_histogram(outcomes: &[RunOutcome]) -> BTreeMap<TermId, usize> {
    let mut counts = BTreeMap::new();
    for term in outcomes.iter().flat_map(|o| o.revealed.iter()) {
        *counts.entry(term.clone()).or_insert(0) += 1;
    }
    counts
}

pub struct Aggregator<'a> {
    strategy: RefinementStrategy,
    context: ScoringContext<'a>,
    index: &'a AnnotationIndex,
    failure_threshold: f64,
    scores: Vec<TestUtilityScore>,
    skipped: Vec<SkippedTest>,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        strategy: RefinementStrategy,
        context: ScoringContext<'a>,
        index: &'a AnnotationIndex,
        failure_threshold: f64,
    ) -> Self {
        Self {
            strategy,
            context,
            index,
            failure_threshold,
            scores: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, test: &TermId, reason: SkipReason) {
        self.skipped.push(SkippedTest {
            test: self.index.term(test),
            reason,
        });
    }

    /// Reduce the successful outcomes of one test into its utility record
    pub fn record(
        &mut self,
        test: &TermId,
        discoverable: &BTreeSet<TermId>,
        mut outcomes: Vec<RunOutcome>,
        repetitions: RepetitionStats,
    ) -> &TestUtilityScore {
        outcomes.sort_by_key(|o| o.repetition);

        let strategy_score = self.strategy.score(&outcomes, &self.context);
        let failure_rate = repetitions.failure_rate();
        let status = if failure_rate > self.failure_threshold {
            stage_warn!(
                Stage::Aggregation,
                test = %test,
                failed = repetitions.failed,
                completed = repetitions.completed,
                "Failure rate {:.2} exceeds threshold {:.2}; utility marked unreliable",
                failure_rate,
                self.failure_threshold
            );
            ScoreStatus::Unreliable
        } else if !strategy_score.sufficient {
            ScoreStatus::InsufficientData
        } else {
            ScoreStatus::Reliable
        };

        let diseases = self.involved_diseases(&outcomes);
        let rank_changes: BTreeMap<DiseaseId, Option<f64>> = diseases
            .iter()
            .map(|d| (d.clone(), average_rank_change(&outcomes, self.context.baseline, d)))
            .collect();
        let defined_changes = rank_changes.values().flatten().copied();
        let min_rank_change = defined_changes.clone().reduce(f64::min);
        let max_rank_change = defined_changes.reduce(f64::max);

        let reveal_counts = reveal_histogram(&outcomes);
        let disease_reveal_counts = self.context.targets.iter()
            .map(|d| (d.clone(), self.per_disease_counts(d, &reveal_counts)))
            .collect();

        stage_debug!(
            Stage::Aggregation,
            test = %test,
            utility = strategy_score.utility,
            samples = strategy_score.samples.len(),
            "Reduced test outcomes"
        );

        self.scores.push(TestUtilityScore {
            test: self.index.term(test),
            utility: strategy_score.utility,
            status,
            repetitions,
            diseases,
            discoverable: discoverable.iter().map(|t| self.index.term(t)).collect(),
            reveal_counts,
            disease_reveal_counts,
            rank_changes,
            min_rank_change,
            max_rank_change,
            distribution: cdf_points(&strategy_score.samples),
        });
        &self.scores[self.scores.len() - 1]
    }

    /// Targets first, then every other disease ranked in any outcome, in first-seen order
    fn involved_diseases(&self, outcomes: &[RunOutcome]) -> Vec<DiseaseId> {
        let mut seen: BTreeSet<&DiseaseId> = BTreeSet::new();
        let mut diseases = Vec::new();
        let candidates = self
            .context
            .targets
            .iter()
            .chain(outcomes.iter().flat_map(|o| o.result.disease_ids()));
        for disease in candidates {
            if seen.insert(disease) {
                diseases.push(disease.clone());
            }
        }
        diseases
    }

    fn per_disease_counts(
        &self,
        disease: &DiseaseId,
        reveal_counts: &BTreeMap<TermId, usize>,
    ) -> BTreeMap<TermId, Option<usize>> {
        let annotated = self.index.phenotypes_of(disease);
        reveal_counts
            .iter()
            .map(|(term, count)| {
                let associated = annotated.is_some_and(|terms| terms.contains(term));
                (term.clone(), associated.then_some(*count))
            })
            .collect()
    }

    /// Sort the table and produce the report
    ///
    /// Ranking order is descending utility with ascending test identifier on
    /// ties, so it never depends on the order tests were recorded in.
    pub fn finish(
        mut self,
        baseline: OracleResult,
        missing_diseases: Vec<DiseaseId>,
        cancelled: bool,
    ) -> RefinementReport {
        self.scores.sort_by(|a, b| {
            b.utility
                .total_cmp(&a.utility)
                .then_with(|| a.test.id.cmp(&b.test.id))
        });
        self.skipped.sort_by(|a, b| a.test.id.cmp(&b.test.id));

        let utilities: Vec<f64> = self.scores.iter().map(|s| s.utility).collect();
        let unreliable = self.scores.iter().filter(|s| !s.is_reliable()).count();
        logging::log_progress(
            Stage::Aggregation,
            "Ranking complete",
            &format!(
                "{} tests ranked, {} flagged, {} skipped",
                self.scores.len(),
                unreliable,
                self.skipped.len()
            ),
        );

        RefinementReport {
            run_id: Uuid::new_v4(),
            strategy: self.strategy,
            targets: self.context.targets.to_vec(),
            missing_diseases,
            baseline,
            ranking: self.scores,
            skipped: self.skipped,
            utility_cdf: cdf_points(&utilities),
            cancelled,
        }
    }
}
