//! Shared types for the differential-diagnosis refinement engine
//!
//! Contains the ontology-level value types that every stage of the engine
//! exchanges (terms, phenotype profiles, oracle rankings), the shared error
//! type, and the tracing bootstrap used by the binary and the tests.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use logging::Stage;
pub use types::*;
