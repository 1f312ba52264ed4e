//! Types shared by the refinement strategies and the aggregator

use serde::{Deserialize, Serialize};
use shared::{DiseaseId, OracleResult, RankedPosition, Term, TermId};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::RefinementStrategy;
use crate::core::CdfPoint;

/// Record of one successful repetition of one diagnostic test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub repetition: usize,
    pub revealed: BTreeSet<TermId>,
    pub result: OracleResult,
    /// Position of every tracked target; `None` when the result does not rank it
    pub targets: BTreeMap<DiseaseId, Option<RankedPosition>>,
}

impl RunOutcome {
    pub fn new(
        repetition: usize,
        revealed: BTreeSet<TermId>,
        result: OracleResult,
        targets: &[DiseaseId],
    ) -> Self {
        let targets = targets
            .iter()
            .map(|d| (d.clone(), result.position_of(d)))
            .collect();
        Self {
            repetition,
            revealed,
            result,
            targets,
        }
    }

    /// Position of a tracked target, falling back to a lookup in the result
    pub fn position(&self, disease: &DiseaseId) -> Option<RankedPosition> {
        match self.targets.get(disease) {
            Some(position) => *position,
            None => self.result.position_of(disease),
        }
    }
}

/// Raw output of a strategy before the aggregator attaches bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyScore {
    pub utility: f64,
    /// One value per outcome that could be scored
    pub samples: Vec<f64>,
    pub sufficient: bool,
}

impl StrategyScore {
    pub fn new(utility: f64, samples: Vec<f64>) -> Self {
        Self {
            utility,
            samples,
            sufficient: true,
        }
    }

    /// Not enough data to score: utility 0, flagged
    pub fn insufficient() -> Self {
        Self {
            utility: 0.0,
            samples: Vec::new(),
            sufficient: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreStatus {
    Reliable,
    /// Too many repetitions failed for the utility to be trusted
    Unreliable,
    /// Too few successful repetitions to compute a utility
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionStats {
    pub requested: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RepetitionStats {
    /// failed / (completed + failed), or 0 when nothing ran
    pub fn failure_rate(&self) -> f64 {
        let attempted = self.completed + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.failed as f64 / attempted as f64
        }
    }

    /// Repetitions that never ran because the run was cancelled
    pub fn not_run(&self) -> usize {
        self.requested.saturating_sub(self.completed + self.failed)
    }
}

/// Final per-test record; immutable once the aggregator produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestUtilityScore {
    pub test: Term,
    pub utility: f64,
    pub status: ScoreStatus,
    pub repetitions: RepetitionStats,
    /// Targets plus every disease any repetition ranked
    pub diseases: Vec<DiseaseId>,
    /// Phenotype terms the test could reveal for this profile
    pub discoverable: Vec<Term>,
    /// Repetitions in which each phenotype term was revealed
    pub reveal_counts: BTreeMap<TermId, usize>,
    /// Per target, the reveal count of each revealed term annotated to it
    pub disease_reveal_counts: BTreeMap<DiseaseId, BTreeMap<TermId, Option<usize>>>,
    /// Average of baseline rank minus post-test rank; `None` when never comparable
    pub rank_changes: BTreeMap<DiseaseId, Option<f64>>,
    pub min_rank_change: Option<f64>,
    pub max_rank_change: Option<f64>,
    /// Empirical CDF of the per-repetition strategy values
    pub distribution: Vec<CdfPoint>,
}

impl TestUtilityScore {
    pub fn is_reliable(&self) -> bool {
        self.status == ScoreStatus::Reliable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    NoDiscoverableTerms,
}

/// A reachable test left out of the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedTest {
    pub test: Term,
    pub reason: SkipReason,
}

/// Everything one refinement run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementReport {
    pub run_id: Uuid,
    pub strategy: RefinementStrategy,
    pub targets: Vec<DiseaseId>,
    /// Requested targets the disease catalog did not know
    pub missing_diseases: Vec<DiseaseId>,
    pub baseline: OracleResult,
    /// Sorted by descending utility, then ascending test identifier
    pub ranking: Vec<TestUtilityScore>,
    pub skipped: Vec<SkippedTest>,
    /// Empirical CDF over the utilities in `ranking`
    pub utility_cdf: Vec<CdfPoint>,
    pub cancelled: bool,
}

impl RefinementReport {
    pub fn score_for(&self, test: &TermId) -> Option<&TestUtilityScore> {
        self.ranking.iter().find(|s| &s.test.id == test)
    }

    /// Test identifiers in ranking order
    pub fn ranked_tests(&self) -> Vec<&TermId> {
        self.ranking.iter().map(|s| &s.test.id).collect()
    }
}
