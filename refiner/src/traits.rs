//! Trait definitions with mockall annotations for testing
//!
//! The orchestrator only talks to the outside world through these traits, so
//! tests can swap the real diagnosis engine for the closed-form stub or for a
//! generated mock.

use serde::{Deserialize, Serialize};
use shared::{DiseaseId, OracleResult, PhenotypeProfile};
use std::collections::BTreeSet;

use crate::error::OracleError;

/// One ranking query sent to a diagnosis oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    pub profile: PhenotypeProfile,
    /// Restrict the ranking to these diseases; `None` ranks every known disease
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_to: Option<BTreeSet<DiseaseId>>,
}

impl RankRequest {
    pub fn new(profile: PhenotypeProfile, restrict_to: Option<BTreeSet<DiseaseId>>) -> Self {
        Self {
            profile,
            restrict_to,
        }
    }

    pub fn unrestricted(profile: PhenotypeProfile) -> Self {
        Self::new(profile, None)
    }
}

/// Diagnosis engine abstraction for dependency injection
///
/// Implementations must be deterministic for identical requests within one
/// process run, and a failed call must leave the implementation usable.
#[mockall::automock]
#[async_trait::async_trait]
pub trait DiagnosisOracle: Send + Sync {
    /// Rank candidate diseases for a phenotype profile
    ///
    /// # Returns
    /// Candidates ordered by descending posttest probability, ties in the
    /// order the engine produced them
    async fn rank(&self, request: &RankRequest) -> Result<OracleResult, OracleError>;
}
