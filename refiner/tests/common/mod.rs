//! Common test utilities and infrastructure
//!
//! Shared fixtures, oracle doubles and builders used by the refiner test suites.

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
#[allow(unused_imports)]
pub use fixtures::TestFixtures;
#[allow(unused_imports)]
pub use helpers::{CancellingOracle, FlakyOracle, HangingOracle, RefinerBuilder, TestHelpers};
