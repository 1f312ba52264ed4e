//! Closed-form diagnosis oracle computed from the disease catalog alone
//!
//! For each candidate disease the log likelihood ratio is
//!
//! ```text
//! sum over present terms annotated with frequency f:   ln(f / EPSILON)
//! sum over excluded terms annotated with frequency f:  ln(1 - f)
//! ```
//!
//! with every factor floored at `EPSILON`. Unannotated terms contribute
//! nothing. Posttest probabilities assume a uniform pretest distribution over
//! the candidates. The result is a pure function of the request, so
//! identical requests always produce identical rankings.

use async_trait::async_trait;
use shared::{stage_debug, DiagnosisCandidate, OracleResult, Stage};
use std::sync::Arc;

use crate::core::{Disease, DiseaseCatalog};
use crate::error::OracleError;
use crate::traits::{DiagnosisOracle, RankRequest};

/// Background probability of observing a phenotype in an unrelated disease
pub const EPSILON: f64 = 0.01;

pub struct StubDiagnosisOracle {
    catalog: Arc<DiseaseCatalog>,
}

impl StubDiagnosisOracle {
    pub fn new(catalog: Arc<DiseaseCatalog>) -> Self {
        Self { catalog }
    }

    fn log_likelihood_ratio(&self, disease: &Disease, request: &RankRequest) -> f64 {
        let present: f64 = request
            .profile
            .present()
            .iter()
            .filter_map(|t| self.catalog.frequency(&disease.id, t))
            .map(|f| (f.max(EPSILON) / EPSILON).ln())
            .sum();
        let excluded: f64 = request
            .profile
            .excluded()
            .iter()
            .filter_map(|t| self.catalog.frequency(&disease.id, t))
            .map(|f| (1.0 - f).max(EPSILON).ln())
            .sum();
        present + excluded
    }
}

#[async_trait]
impl DiagnosisOracle for StubDiagnosisOracle {
    async fn rank(&self, request: &RankRequest) -> Result<OracleResult, OracleError> {
        let candidates: Vec<&Disease> = self
            .catalog
            .iter()
            .filter(|d| {
                request
                    .restrict_to
                    .as_ref()
                    .map_or(true, |allowed| allowed.contains(&d.id))
            })
            .collect();
        if candidates.is_empty() {
            return Err(OracleError::analysis_failed(format!(
                "no candidate diseases for profile {}",
                request.profile.id()
            )));
        }

        let log_lrs: Vec<f64> = candidates
            .iter()
            .map(|d| self.log_likelihood_ratio(d, request))
            .collect();
        let max_log_lr = log_lrs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = log_lrs.iter().map(|l| (l - max_log_lr).exp()).sum();

        let ranked = candidates
            .iter()
            .zip(&log_lrs)
            .map(|(disease, log_lr)| {
                DiagnosisCandidate::new(
                    disease.id.clone(),
                    (log_lr - max_log_lr).exp() / total,
                    log_lr.exp(),
                )
            })
            .collect();

        stage_debug!(
            Stage::Oracle,
            profile = request.profile.id(),
            candidates = candidates.len(),
            present = request.profile.present().len(),
            "Stub oracle ranked candidates"
        );
        Ok(OracleResult::from_unsorted(ranked))
    }
}
