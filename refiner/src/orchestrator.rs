//! Simulation orchestrator
//!
//! For every diagnostic test reachable from the target diseases the
//! orchestrator simulates `repetitions` orderings of that test: it reveals a
//! subset of the phenotypes the test could uncover, re-ranks the augmented
//! profile with the injected [`DiagnosisOracle`] and records where the
//! targets land. Repetitions run on a bounded pool of tokio tasks; their
//! results go into write-once slots and are reduced per test by the
//! [`Aggregator`] once the pool has drained.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{self, JoinSet};
use tokio::time::Instant;

use shared::{
    logging, stage_debug, stage_error, stage_info, stage_warn, DiseaseId, OracleResult, PhenotypeProfile, Stage, TermId,
};

use crate::{
    config::RefinementConfig,
    core::{
        reveal_probability, Aggregator, AnnotationIndex, AnnotationTable, DiseaseCatalog, RevealSampler,
        SamplingPolicy,
    },
    error::{OracleError, RefinerError, RefinerResult},
    refinement::{RefinementReport, RepetitionStats, RunOutcome, ScoringContext, SkipReason},
    traits::{DiagnosisOracle, RankRequest},
};

/// What to refine: a patient profile, its baseline ranking and the diseases to track
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub profile: PhenotypeProfile,
    pub baseline: OracleResult,
    pub targets: Vec<DiseaseId>,
}

impl SimulationRequest {
    pub fn new(profile: PhenotypeProfile, baseline: OracleResult, targets: Vec<DiseaseId>) -> Self {
        Self {
            profile,
            baseline,
            targets,
        }
    }

    /// Track the `n` best-ranked baseline diseases
    pub fn with_top_targets(profile: PhenotypeProfile, baseline: OracleResult, n: usize) -> Self {
        let targets = baseline.top(n).disease_ids().cloned().collect();
        Self::new(profile, baseline, targets)
    }
}

/// Handle that stops a running simulation from outside
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Stop issuing repetitions and abandon the ones in flight
    ///
    /// Cancellation is sticky: later runs on the same orchestrator fail with
    /// [`RefinerError::Cancelled`].
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One diagnostic test with the phenotypes it could reveal
struct PlannedTest {
    test: TermId,
    discoverable: BTreeSet<TermId>,
}

/// One repetition, fully determined before dispatch
struct Job {
    test_idx: usize,
    repetition: usize,
    revealed: BTreeSet<TermId>,
    request: RankRequest,
}

type Slot = Option<Result<RunOutcome, OracleError>>;

pub struct SimulationOrchestrator<O>
where
    O: DiagnosisOracle + 'static,
{
    oracle: Arc<O>,
    catalog: Arc<DiseaseCatalog>,
    annotations: Arc<AnnotationTable>,
    config: RefinementConfig,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl<O> SimulationOrchestrator<O>
where
    O: DiagnosisOracle + 'static,
{
    /// Create an orchestrator with an injected oracle; the configuration is validated here
    pub fn new(
        oracle: Arc<O>,
        catalog: Arc<DiseaseCatalog>,
        annotations: Arc<AnnotationTable>,
        config: RefinementConfig,
    ) -> RefinerResult<Self> {
        config.validate()?;
        let (cancel_tx, _) = watch::channel(false);
        Ok(Self {
            oracle,
            catalog,
            annotations,
            config,
            cancel_tx: Arc::new(cancel_tx),
        })
    }

    /// Get a handle for external cancellation requests
    pub fn get_cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Rank the unmodified profile; any oracle failure here is fatal
    pub async fn baseline(&self, profile: &PhenotypeProfile) -> RefinerResult<OracleResult> {
        let result = match self.oracle.rank(&RankRequest::unrestricted(profile.clone())).await {
            Ok(result) => result,
            Err(error) => {
                stage_error!(Stage::Oracle, profile = profile.id(), "Baseline ranking failed: {}", error);
                return Err(error.into());
            }
        };
        if result.is_empty() {
            return Err(RefinerError::OracleAnalysisFailed {
                reason: format!("baseline ranking for {} is empty", profile.id()),
            });
        }
        Ok(result)
    }

    /// Simulate every reachable test and rank the tests by utility
    pub async fn run(&self, request: SimulationRequest) -> RefinerResult<RefinementReport> {
        let mut cancel_rx = self.cancel_tx.subscribe();
        if *cancel_rx.borrow_and_update() {
            return Err(RefinerError::Cancelled);
        }

        let (targets, missing) = self.resolve_targets(&request.targets)?;
        let (resolved, _) = self.catalog.resolve(targets.iter());
        let index = AnnotationIndex::build(resolved, &self.annotations);
        let strategy = self.config.refinement_strategy();

        logging::log_startup(
            Stage::Simulation,
            &format!(
                "{} refinement of {} over {} targets, {} tests, {} repetitions each",
                strategy,
                request.profile.id(),
                targets.len(),
                index.tests().len(),
                self.config.repetitions
            ),
        );

        let context = ScoringContext {
            baseline: &request.baseline,
            targets: &targets,
            min_samples: self.config.min_samples,
        };
        let mut aggregator = Aggregator::new(strategy, context, &index, self.config.failure_threshold);

        let mut planned = Vec::new();
        for test in index.tests() {
            let discoverable = index.discoverable(test, &request.profile);
            if discoverable.is_empty() {
                stage_debug!(Stage::Simulation, test = %test, "No discoverable phenotypes; skipping test");
                aggregator.skip(test, SkipReason::NoDiscoverableTerms);
            } else {
                planned.push(PlannedTest {
                    test: test.clone(),
                    discoverable,
                });
            }
        }

        let restrict_to: BTreeSet<DiseaseId> = targets
            .iter()
            .chain(request.baseline.disease_ids())
            .cloned()
            .collect();
        let sampler = self.sampler(&index, &request.baseline, &targets);
        let jobs = self.plan_jobs(&planned, &sampler, &request.profile, &restrict_to)?;

        let (slots, cancelled) = self.dispatch(jobs, planned.len(), &targets, &mut cancel_rx).await?;

        for (plan, test_slots) in planned.iter().zip(slots) {
            let mut outcomes = Vec::new();
            let mut stats = RepetitionStats {
                requested: self.config.repetitions,
                ..Default::default()
            };
            for slot in test_slots.into_iter().flatten() {
                match slot {
                    Ok(outcome) => {
                        stats.completed += 1;
                        outcomes.push(outcome);
                    }
                    Err(_) => stats.failed += 1,
                }
            }
            if stats.not_run() > 0 {
                stage_debug!(
                    Stage::Aggregation,
                    test = %plan.test,
                    not_run = stats.not_run(),
                    "Reducing test with fewer repetitions than requested"
                );
            }
            aggregator.record(&plan.test, &plan.discoverable, outcomes, stats);
        }

        let report = aggregator.finish(request.baseline.clone(), missing, cancelled);
        logging::log_success(
            Stage::Simulation,
            &format!("Ranked {} diagnostic tests", report.ranking.len()),
        );
        Ok(report)
    }

    /// Known targets in request order without duplicates, plus the unknown ones
    fn resolve_targets(&self, requested: &[DiseaseId]) -> RefinerResult<(Vec<DiseaseId>, Vec<DiseaseId>)> {
        if requested.is_empty() {
            return Err(RefinerError::config("targets", "at least one target disease is required"));
        }
        let unique: Vec<&DiseaseId> = {
            let mut seen = BTreeSet::new();
            requested.iter().filter(|d| seen.insert(*d)).collect()
        };
        let (resolved, missing) = self.catalog.resolve(unique);
        for disease in &missing {
            stage_warn!(Stage::Index, disease = %disease, "Target disease not in catalog; skipping");
        }
        if resolved.is_empty() {
            return Err(RefinerError::MissingDisease {
                disease_ids: missing,
            });
        }
        Ok((resolved.into_iter().map(|d| d.id.clone()).collect(), missing))
    }

    fn sampler(&self, index: &AnnotationIndex, baseline: &OracleResult, targets: &[DiseaseId]) -> RevealSampler {
        let sampler = RevealSampler::new(self.config.sampling);
        if self.config.sampling != SamplingPolicy::FrequencyWeighted {
            return sampler;
        }
        let disease_probabilities = self.config.probability_model.probabilities(baseline, targets);
        let reveal_probabilities = index
            .phenotypes()
            .iter()
            .map(|term| {
                (
                    term.clone(),
                    reveal_probability(term, &disease_probabilities, &self.catalog),
                )
            })
            .collect();
        sampler.with_reveal_probabilities(reveal_probabilities)
    }

    /// Draw every revealed subset up front, in (test, repetition) order
    fn plan_jobs(
        &self,
        planned: &[PlannedTest],
        sampler: &RevealSampler,
        profile: &PhenotypeProfile,
        restrict_to: &BTreeSet<DiseaseId>,
    ) -> RefinerResult<Vec<Job>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut jobs = Vec::with_capacity(planned.len() * self.config.repetitions);
        for (test_idx, plan) in planned.iter().enumerate() {
            for repetition in 0..self.config.repetitions {
                let revealed = sampler.draw(&plan.discoverable, &mut rng);
                let augmented = profile.augmented(revealed.iter())?;
                jobs.push(Job {
                    test_idx,
                    repetition,
                    revealed,
                    request: RankRequest::new(augmented, Some(restrict_to.clone())),
                });
            }
        }
        Ok(jobs)
    }

    /// Run the jobs on at most `workers` concurrent tasks
    ///
    /// Returns one slot per (test, repetition) and whether the run stopped
    /// early. Slots of repetitions that never finished stay `None`.
    async fn dispatch(
        &self,
        jobs: Vec<Job>,
        test_count: usize,
        targets: &[DiseaseId],
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> RefinerResult<(Vec<Vec<Slot>>, bool)> {
        let repetitions = self.config.repetitions;
        let mut slots: Vec<Vec<Slot>> = (0..test_count)
            .map(|_| (0..repetitions).map(|_| None).collect())
            .collect();
        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        let targets: Arc<[DiseaseId]> = targets.into();

        let mut pending = jobs.into_iter();
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<task::Id, (usize, usize)> = HashMap::new();
        let mut cancelled = false;

        loop {
            while join_set.len() < self.config.workers {
                let Some(job) = pending.next() else { break };
                let oracle = Arc::clone(&self.oracle);
                let targets = Arc::clone(&targets);
                let slot = (job.test_idx, job.repetition);
                let handle = join_set.spawn(async move {
                    oracle
                        .rank(&job.request)
                        .await
                        .map(|ranked| RunOutcome::new(job.repetition, job.revealed, ranked, &targets))
                });
                in_flight.insert(handle.id(), slot);
            }
            if join_set.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancellation(cancel_rx) => {
                    stage_warn!(Stage::Simulation, in_flight = join_set.len(), "Run cancelled; abandoning in-flight repetitions");
                    cancelled = true;
                    break;
                }
                _ = deadline_reached(deadline) => {
                    stage_warn!(Stage::Simulation, in_flight = join_set.len(), "Run timed out; abandoning in-flight repetitions");
                    cancelled = true;
                    break;
                }
                Some(joined) = join_set.join_next_with_id() => {
                    let (task_id, result) = match joined {
                        Ok((task_id, result)) => (task_id, result),
                        Err(join_error) if join_error.is_panic() => {
                            stage_error!(Stage::Oracle, "Repetition task panicked: {}", join_error);
                            (join_error.id(), Err(OracleError::analysis_failed("oracle call panicked")))
                        }
                        Err(join_error) => return Err(join_error.into()),
                    };
                    let Some((test_idx, repetition)) = in_flight.remove(&task_id) else {
                        continue;
                    };
                    if let Err(error) = &result {
                        stage_warn!(Stage::Oracle, repetition, "Repetition failed: {}", error);
                    } else {
                        stage_debug!(Stage::Simulation, test_idx, repetition, "Repetition completed");
                    }
                    let slot = &mut slots[test_idx][repetition];
                    debug_assert!(slot.is_none(), "repetition slot written twice");
                    *slot = Some(result);
                }
            }
        }

        join_set.abort_all();
        if cancelled {
            stage_info!(Stage::Simulation, "Keeping outcomes of completed repetitions");
        }
        Ok((slots, cancelled))
    }
}

/// Resolves once cancellation has been requested
async fn cancellation(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Disease;
    use crate::refinement::ScoreStatus;
    use crate::traits::MockDiagnosisOracle;
    use shared::{DiagnosisCandidate, Term};

    fn id(s: &str) -> TermId {
        TermId::parse(s).unwrap()
    }

    fn catalog() -> Arc<DiseaseCatalog> {
        Arc::new(
            DiseaseCatalog::new(
                vec![
                    Disease::new(id("OMIM:1"), "A").with_annotation(Term::new(id("HP:1"), ""), None),
                    Disease::new(id("OMIM:2"), "B").with_annotation(Term::new(id("HP:2"), ""), None),
                ],
                1.0,
            )
            .unwrap(),
        )
    }

    fn annotations() -> Arc<AnnotationTable> {
        let mut table = AnnotationTable::new();
        table.insert(Term::new(id("HP:1"), ""), Term::new(id("MAXO:1"), ""));
        table.insert(Term::new(id("HP:2"), ""), Term::new(id("MAXO:2"), ""));
        Arc::new(table)
    }

    fn baseline() -> OracleResult {
        OracleResult::from_unsorted(vec![
            DiagnosisCandidate::new(id("OMIM:1"), 0.6, 6.0),
            DiagnosisCandidate::new(id("OMIM:2"), 0.4, 4.0),
        ])
    }

    fn config() -> RefinementConfig {
        RefinementConfig {
            repetitions: 3,
            workers: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let bad = RefinementConfig {
            workers: 0,
            ..Default::default()
        };
        let result = SimulationOrchestrator::new(
            Arc::new(MockDiagnosisOracle::new()),
            catalog(),
            annotations(),
            bad,
        );
        assert!(matches!(result, Err(RefinerError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_unknown_targets_are_fatal_only_when_all_missing() {
        let mut oracle = MockDiagnosisOracle::new();
        oracle.expect_rank().returning(|_| Ok(baseline()));
        let orchestrator =
            SimulationOrchestrator::new(Arc::new(oracle), catalog(), annotations(), config()).unwrap();
        let profile = PhenotypeProfile::new("p", [], []).unwrap();

        let all_missing = SimulationRequest::new(profile.clone(), baseline(), vec![id("OMIM:404")]);
        assert!(matches!(
            orchestrator.run(all_missing).await,
            Err(RefinerError::MissingDisease { .. })
        ));

        let partly = SimulationRequest::new(profile, baseline(), vec![id("OMIM:404"), id("OMIM:1")]);
        let report = orchestrator.run(partly).await.unwrap();
        assert_eq!(report.missing_diseases, vec![id("OMIM:404")]);
        assert_eq!(report.targets, vec![id("OMIM:1")]);
        assert_eq!(report.ranked_tests(), vec![&id("MAXO:1")]);
    }

    #[tokio::test]
    async fn test_every_repetition_is_restricted_to_target_pool() {
        let mut oracle = MockDiagnosisOracle::new();
        oracle
            .expect_rank()
            .withf(|request| {
                request.restrict_to.as_ref().is_some_and(|pool| {
                    pool.contains(&TermId::parse("OMIM:1").unwrap())
                        && pool.contains(&TermId::parse("OMIM:2").unwrap())
                })
            })
            .times(6)
            .returning(|_| Ok(baseline()));
        let orchestrator =
            SimulationOrchestrator::new(Arc::new(oracle), catalog(), annotations(), config()).unwrap();
        let profile = PhenotypeProfile::new("p", [], []).unwrap();

        let report = orchestrator
            .run(SimulationRequest::with_top_targets(profile, baseline(), 2))
            .await
            .unwrap();
        assert_eq!(report.ranking.len(), 2);
        assert!(report.ranking.iter().all(|s| s.repetitions.completed == 3));
    }

    #[tokio::test]
    async fn test_baseline_failure_is_fatal() {
        let mut oracle = MockDiagnosisOracle::new();
        oracle
            .expect_rank()
            .returning(|_| Err(OracleError::unavailable("connection refused")));
        let orchestrator =
            SimulationOrchestrator::new(Arc::new(oracle), catalog(), annotations(), config()).unwrap();
        let profile = PhenotypeProfile::new("p", [], []).unwrap();

        assert!(matches!(
            orchestrator.baseline(&profile).await,
            Err(RefinerError::OracleUnavailable { .. })
        ));
    }

    /// Panics whenever the profile reveals `HP:1`
    struct PanickingOracle;

    #[async_trait::async_trait]
    impl DiagnosisOracle for PanickingOracle {
        async fn rank(&self, request: &RankRequest) -> Result<OracleResult, OracleError> {
            if request.profile.present().contains(&id("HP:1")) {
                panic!("ranking engine crashed");
            }
            Ok(baseline())
        }
    }

    #[tokio::test]
    async fn test_panicking_repetitions_count_as_failures() {
        let orchestrator =
            SimulationOrchestrator::new(Arc::new(PanickingOracle), catalog(), annotations(), config()).unwrap();
        let profile = PhenotypeProfile::new("p", [], []).unwrap();

        let report = orchestrator
            .run(SimulationRequest::with_top_targets(profile, baseline(), 2))
            .await
            .unwrap();

        let crashing = report.score_for(&id("MAXO:1")).unwrap();
        assert_eq!(crashing.repetitions.failed, 3);
        assert_eq!(crashing.repetitions.completed, 0);
        assert_eq!(crashing.status, ScoreStatus::Unreliable);
        let healthy = report.score_for(&id("MAXO:2")).unwrap();
        assert_eq!(healthy.repetitions.completed, 3);
        assert_eq!(healthy.repetitions.failed, 0);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_orchestrator_refuses_new_runs() {
        let orchestrator = SimulationOrchestrator::new(
            Arc::new(MockDiagnosisOracle::new()),
            catalog(),
            annotations(),
            config(),
        )
        .unwrap();
        let handle = orchestrator.get_cancel_handle();
        handle.cancel();
        assert!(handle.is_cancelled());

        let profile = PhenotypeProfile::new("p", [], []).unwrap();
        let request = SimulationRequest::with_top_targets(profile, baseline(), 2);
        assert!(matches!(orchestrator.run(request).await, Err(RefinerError::Cancelled)));
    }
}
