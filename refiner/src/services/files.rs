//! JSON inputs and the report output

use serde::de::DeserializeOwned;
use shared::{logging, OracleResult, PhenotypeProfile, Stage};
use std::path::Path;
use tokio::fs;

use crate::core::{Disease, DiseaseCatalog};
use crate::error::{RefinerError, RefinerResult};
use crate::refinement::RefinementReport;

async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> RefinerResult<T> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        RefinerError::config(what, format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| RefinerError::config(what, format!("{} is not valid: {e}", path.display())))
}

/// Disease catalog from a JSON array of diseases
pub async fn load_catalog(path: &Path, default_frequency: f64) -> RefinerResult<DiseaseCatalog> {
    let diseases: Vec<Disease> = read_json(path, "diseases").await?;
    if diseases.is_empty() {
        return Err(RefinerError::config(
            "diseases",
            format!("{} lists no diseases", path.display()),
        ));
    }
    DiseaseCatalog::new(diseases, default_frequency)
}

pub async fn load_profile(path: &Path) -> RefinerResult<PhenotypeProfile> {
    read_json(path, "sample").await
}

/// Baseline ranking previously produced by the oracle
pub async fn load_baseline(path: &Path) -> RefinerResult<OracleResult> {
    read_json(path, "baseline").await
}

/// Write the report as pretty-printed JSON, creating parent directories
pub async fn write_report(path: &Path, report: &RefinementReport) -> RefinerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).await?;
    logging::log_success(Stage::Io, &format!("Report written to {}", path.display()));
    Ok(())
}
