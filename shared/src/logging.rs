//! Shared logging utilities for consistent tracing across the engine
//!
//! Every event emitted through the `stage_*` macros carries the pipeline
//! stage that produced it and a wall-clock timestamp, so interleaved output
//! from concurrent repetitions can still be attributed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info};

/// Pipeline stage that emitted a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Io,
    Index,
    Oracle,
    Simulation,
    Refinement,
    Aggregation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Io => write!(f, "io"),
            Stage::Index => write!(f, "index"),
            Stage::Oracle => write!(f, "oracle"),
            Stage::Simulation => write!(f, "simulation"),
            Stage::Refinement => write!(f, "refinement"),
            Stage::Aggregation => write!(f, "aggregation"),
        }
    }
}

/// Filter directive for the given base level
fn filter_directive(base_level: &str) -> String {
    format!("refiner={base_level},dxrefine={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize a stdout tracing subscriber with an optional base log level
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directive(base_level)))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for stage-aware info logging
#[macro_export]
macro_rules! stage_info {
    ($stage:expr, $($arg:tt)*) => {
        tracing::info!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for stage-aware warning logging
#[macro_export]
macro_rules! stage_warn {
    ($stage:expr, $($arg:tt)*) => {
        tracing::warn!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for stage-aware error logging
#[macro_export]
macro_rules! stage_error {
    ($stage:expr, $($arg:tt)*) => {
        tracing::error!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for stage-aware debug logging
#[macro_export]
macro_rules! stage_debug {
    ($stage:expr, $($arg:tt)*) => {
        tracing::debug!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(stage: Stage, details: &str) {
    info!(
        stage = %stage,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(stage: Stage, context: &str, error: &dyn fmt::Display) {
    error!(
        stage = %stage,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(stage: Stage, message: &str) {
    info!(
        stage = %stage,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(stage: Stage, action: &str, details: &str) {
    info!(
        stage = %stage,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}
