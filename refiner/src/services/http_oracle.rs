//! Production diagnosis oracle backed by a remote ranking service
//!
//! Each [`RankRequest`] is POSTed as JSON to the configured endpoint; the
//! service answers with a JSON array of
//! `{disease_id, posttest_probability, likelihood_ratio}` objects.
//!
//! ## Configuration Sources
//! The endpoint comes from `--oracle-url` or the `DXREFINE_ORACLE_URL`
//! environment variable (a `.env` file is honoured).

use async_trait::async_trait;
use reqwest::StatusCode;
use shared::{stage_debug, DiagnosisCandidate, OracleResult, Stage};
use std::time::Duration;
use url::Url;

use crate::error::{OracleError, RefinerError, RefinerResult};
use crate::traits::{DiagnosisOracle, RankRequest};

/// Environment variable holding the oracle endpoint
pub const ORACLE_URL_ENV: &str = "DXREFINE_ORACLE_URL";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpDiagnosisOracle {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDiagnosisOracle {
    pub fn new(endpoint: Url) -> RefinerResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: Url, timeout: Duration) -> RefinerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RefinerError::OracleUnavailable {
                reason: format!("HTTP client could not be built: {e}"),
            })?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint from `DXREFINE_ORACLE_URL`, loading `.env` first
    pub fn from_env() -> RefinerResult<Self> {
        let _ = dotenv::dotenv();
        let raw = std::env::var(ORACLE_URL_ENV)
            .map_err(|_| RefinerError::config("oracle_url", format!("{ORACLE_URL_ENV} is not set")))?;
        Self::new(parse_endpoint(&raw)?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

pub fn parse_endpoint(raw: &str) -> RefinerResult<Url> {
    Url::parse(raw).map_err(|e| RefinerError::config("oracle_url", format!("'{raw}': {e}")))
}

#[async_trait]
impl DiagnosisOracle for HttpDiagnosisOracle {
    async fn rank(&self, request: &RankRequest) -> Result<OracleResult, OracleError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    OracleError::unavailable(e.to_string())
                } else {
                    OracleError::analysis_failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::SERVICE_UNAVAILABLE => {
                    OracleError::unavailable(format!("oracle responded {status}"))
                }
                _ => OracleError::analysis_failed(format!("oracle responded {status}")),
            });
        }

        let candidates: Vec<DiagnosisCandidate> = response
            .json()
            .await
            .map_err(|e| OracleError::analysis_failed(format!("Failed to parse response: {e}")))?;

        stage_debug!(
            Stage::Oracle,
            profile = request.profile.id(),
            candidates = candidates.len(),
            "Remote oracle answered"
        );
        Ok(OracleResult::from_unsorted(candidates))
    }
}
