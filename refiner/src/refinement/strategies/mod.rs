//! Utility computations behind each [`RefinementStrategy`](super::RefinementStrategy) variant

pub mod dd_score;
pub mod rank;
pub mod score;
