//! Core business logic components
//!
//! Pure data structures and computations; nothing in here performs I/O or
//! talks to a diagnosis oracle.

pub mod aggregate;
pub mod catalog;
pub mod distribution;
pub mod index;
pub mod probability;
pub mod sampling;

pub use aggregate::{reveal_histogram, Aggregator};
pub use catalog::{Disease, DiseaseCatalog, PhenotypeAnnotation};
pub use distribution::{cdf, cdf_points, ecdf_at, ks_statistic, sorted, CdfPoint};
pub use index::{AnnotationIndex, AnnotationTable};
pub use probability::{reveal_probability, DiseaseProbabilityModel};
pub use sampling::{RevealSampler, SamplingPolicy};
