//! Differential-diagnosis refinement engine
//!
//! Estimates how much each candidate diagnostic test would sharpen a
//! patient's differential diagnosis. Phenotypes a test could reveal are
//! simulated, a diagnosis oracle re-ranks the augmented profile, and a
//! refinement strategy condenses the repeated runs into one utility per test.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod refinement;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{RefinementConfig, StrategyKind};
pub use core::{
    cdf, AnnotationIndex, AnnotationTable, Disease, DiseaseCatalog, DiseaseProbabilityModel, SamplingPolicy,
};
pub use error::{OracleError, RefinerError, RefinerResult};
pub use orchestrator::{CancelHandle, SimulationOrchestrator, SimulationRequest};
pub use refinement::{
    RefinementReport, RefinementStrategy, RunOutcome, ScoreStatus, SkipReason, TestUtilityScore,
};
pub use traits::{DiagnosisOracle, RankRequest};
