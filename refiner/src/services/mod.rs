//! Service implementations
//!
//! Everything that touches the file system or a diagnosis engine lives here;
//! the orchestrator only sees these through the [`DiagnosisOracle`](crate::traits::DiagnosisOracle)
//! trait or as already-loaded values.

pub mod annotations;
pub mod files;
pub mod http_oracle;
pub mod stub_oracle;

#[cfg(test)]
mod tests;

pub use annotations::{load_annotation_table, parse_annotation_table};
pub use http_oracle::HttpDiagnosisOracle;
pub use stub_oracle::StubDiagnosisOracle;
