//! Test helpers and builder patterns for refiner tests
//!
//! Oracle doubles that fail or cancel on cue, plus a builder that wires an
//! orchestrator over the standard fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use refiner::services::StubDiagnosisOracle;
use refiner::*;
use shared::{OracleResult, TermId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use super::fixtures::TestFixtures;

/// Builder pattern for creating test orchestrators with sensible defaults
pub struct RefinerBuilder {
    config: RefinementConfig,
}

impl RefinerBuilder {
    /// Full reveal, two successful repetitions minimum, four workers
    pub fn new() -> Self {
        Self {
            config: RefinementConfig {
                repetitions: 4,
                workers: 4,
                ..Default::default()
            },
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.config.weight = weight;
        self
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.config.repetitions = repetitions;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.config.sampling = sampling;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Build over the stub oracle
    pub fn build(self) -> SimulationOrchestrator<StubDiagnosisOracle> {
        let oracle = Arc::new(StubDiagnosisOracle::new(TestFixtures::catalog()));
        self.build_with(oracle)
    }

    /// Build over any oracle
    pub fn build_with<O: DiagnosisOracle + 'static>(self, oracle: Arc<O>) -> SimulationOrchestrator<O> {
        SimulationOrchestrator::new(
            oracle,
            TestFixtures::catalog(),
            TestFixtures::annotations(),
            self.config,
        )
        .unwrap()
    }
}

/// Stub oracle that fails the first `failures` calls revealing `term`
pub struct FlakyOracle {
    inner: StubDiagnosisOracle,
    term: TermId,
    failures: usize,
    seen: AtomicUsize,
}

impl FlakyOracle {
    pub fn new(term: TermId, failures: usize) -> Self {
        Self {
            inner: StubDiagnosisOracle::new(TestFixtures::catalog()),
            term,
            failures,
            seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DiagnosisOracle for FlakyOracle {
    async fn rank(&self, request: &RankRequest) -> Result<OracleResult, OracleError> {
        if request.profile.present().contains(&self.term)
            && self.seen.fetch_add(1, Ordering::SeqCst) < self.failures
        {
            return Err(OracleError::analysis_failed("injected failure"));
        }
        self.inner.rank(request).await
    }
}

/// Stub oracle that answers `answered` calls, then cancels the run and never returns
pub struct CancellingOracle {
    inner: StubDiagnosisOracle,
    answered: usize,
    calls: AtomicUsize,
    handle: Arc<OnceLock<CancelHandle>>,
}

impl CancellingOracle {
    pub fn new(answered: usize) -> Self {
        Self {
            inner: StubDiagnosisOracle::new(TestFixtures::catalog()),
            answered,
            calls: AtomicUsize::new(0),
            handle: Arc::new(OnceLock::new()),
        }
    }

    pub fn arm(&self, handle: CancelHandle) {
        let _ = self.handle.set(handle);
    }
}

#[async_trait]
impl DiagnosisOracle for CancellingOracle {
    async fn rank(&self, request: &RankRequest) -> Result<OracleResult, OracleError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.answered {
            return self.inner.rank(request).await;
        }
        if let Some(handle) = self.handle.get() {
            handle.cancel();
        }
        std::future::pending().await
    }
}

/// Oracle that never answers
pub struct HangingOracle;

#[async_trait]
impl DiagnosisOracle for HangingOracle {
    async fn rank(&self, _request: &RankRequest) -> Result<OracleResult, OracleError> {
        std::future::pending().await
    }
}

/// Common helper functions for tests
pub struct TestHelpers;

impl TestHelpers {
    /// Baseline ranking of the fixture patient under the stub oracle
    pub async fn baseline() -> OracleResult {
        StubDiagnosisOracle::new(TestFixtures::catalog())
            .rank(&RankRequest::unrestricted(TestFixtures::profile()))
            .await
            .unwrap()
    }

    /// Fixture patient tracking all three diseases
    pub async fn scenario_request() -> SimulationRequest {
        SimulationRequest::new(
            TestFixtures::profile(),
            Self::baseline().await,
            TestFixtures::all_diseases(),
        )
    }

    pub fn score<'a>(report: &'a RefinementReport, test: &str) -> &'a TestUtilityScore {
        report
            .score_for(&TestFixtures::id(test))
            .unwrap_or_else(|| panic!("{test} missing from ranking"))
    }

    pub fn rank_change(score: &TestUtilityScore, disease: &str) -> Option<f64> {
        score
            .rank_changes
            .get(&TestFixtures::id(disease))
            .copied()
            .flatten()
    }

    pub fn ranking(report: &RefinementReport) -> Vec<(String, f64)> {
        report
            .ranking
            .iter()
            .map(|s| (s.test.id.to_string(), s.utility))
            .collect()
    }
}
