//! Main entry point for the dxrefine binary
//!
//! Loads the annotation table, disease catalog and patient sample, wires the
//! chosen diagnosis oracle into the orchestrator and writes the ranked
//! diagnostic tests as JSON.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use refiner::{
    core::{DiseaseProbabilityModel, SamplingPolicy},
    services::{files, http_oracle, load_annotation_table, HttpDiagnosisOracle, StubDiagnosisOracle},
    DiagnosisOracle, DiseaseCatalog, RefinementConfig, RefinementReport, RefinerError, RefinerResult,
    SimulationOrchestrator, SimulationRequest, StrategyKind,
};
use shared::{logging, stage_debug, stage_info, DiseaseId, Stage};

const LOG_LEVEL_ENV: &str = "DXREFINE_LOG_LEVEL";

/// Rank diagnostic tests by how much they would refine a differential diagnosis
#[derive(Parser)]
#[command(name = "dxrefine")]
#[command(about = "Simulates diagnostic tests against a diagnosis oracle and ranks them by utility")]
pub struct Args {
    /// Phenotype-to-test annotation table (TSV)
    #[arg(long)]
    pub annotations: PathBuf,

    /// Disease catalog (JSON array of diseases with annotated phenotypes)
    #[arg(long)]
    pub diseases: PathBuf,

    /// Patient sample (JSON with id, present and excluded terms)
    #[arg(long)]
    pub sample: PathBuf,

    /// Precomputed baseline ranking; the oracle is queried when omitted
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Target diseases; defaults to the top --n-diseases of the baseline
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<DiseaseId>,

    /// Remote oracle endpoint (falls back to DXREFINE_ORACLE_URL)
    #[arg(long)]
    pub oracle_url: Option<String>,

    /// Use the closed-form stub oracle instead of a remote service
    #[arg(long)]
    pub stub_oracle: bool,

    /// Refinement strategy (score, rank, ddScore, ksTest)
    #[arg(long, default_value = "score")]
    pub strategy: StrategyKind,

    /// Repetitions per diagnostic test
    #[arg(long, default_value = "10")]
    pub repetitions: usize,

    /// Sampling policy (full, random, frequency)
    #[arg(long, default_value = "full")]
    pub sampling: SamplingPolicy,

    /// Probability weight of the score strategy blend
    #[arg(long, default_value = "0.5")]
    pub weight: f64,

    /// Concurrent repetitions (defaults to available parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Failure ratio above which a test is marked unreliable
    #[arg(long, default_value = "0.3")]
    pub failure_threshold: f64,

    /// Successful repetitions required before a utility is reported
    #[arg(long, default_value = "2")]
    pub min_samples: usize,

    /// Seed for random sampling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Overall run timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Frequency assumed for annotations without one
    #[arg(long, default_value = "1.0")]
    pub default_frequency: f64,

    /// Disease probability model for frequency sampling (ranked, softmax, expDecay)
    #[arg(long, default_value = "ranked")]
    pub probability_model: DiseaseProbabilityModel,

    /// Decay rate of the expDecay model
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Number of baseline diseases used as targets
    #[arg(long, default_value = "10")]
    pub n_diseases: usize,

    /// Report destination
    #[arg(long, default_value = "refinement.json")]
    pub output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Map flags onto a configuration; `--lambda` is only accepted with the expDecay model
    fn config(&self) -> RefinerResult<RefinementConfig> {
        let defaults = RefinementConfig::default();
        let probability_model = match (self.probability_model, self.lambda) {
            (DiseaseProbabilityModel::ExponentialDecay { .. }, Some(lambda)) => {
                DiseaseProbabilityModel::ExponentialDecay { lambda }
            }
            (model, Some(_)) => {
                return Err(RefinerError::config(
                    "lambda",
                    format!("only applies to the expDecay probability model, not {model}"),
                ));
            }
            (model, None) => model,
        };
        Ok(RefinementConfig {
            strategy: self.strategy,
            repetitions: self.repetitions,
            sampling: self.sampling,
            weight: self.weight,
            workers: self.workers.unwrap_or(defaults.workers),
            failure_threshold: self.failure_threshold,
            min_samples: self.min_samples,
            seed: self.seed,
            timeout_secs: self.timeout,
            default_frequency: self.default_frequency,
            probability_model,
            n_diseases: self.n_diseases,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    let log_level = args.log_level.clone().or_else(|| std::env::var(LOG_LEVEL_ENV).ok());
    logging::init_tracing(log_level.as_deref());
    logging::log_startup(Stage::Io, "dxrefine");

    let config = args.config()?;
    config.validate()?;
    stage_debug!(Stage::Io, "Configuration: {:?}", config);

    let annotations = Arc::new(
        load_annotation_table(&args.annotations).context("loading annotation table")?,
    );
    let catalog = Arc::new(
        files::load_catalog(&args.diseases, config.default_frequency)
            .await
            .context("loading disease catalog")?,
    );
    stage_info!(
        Stage::Io,
        diseases = catalog.len(),
        phenotypes = annotations.phenotype_count(),
        skipped_rows = annotations.skipped_rows(),
        "Inputs loaded"
    );

    let report = if args.stub_oracle {
        let oracle = Arc::new(StubDiagnosisOracle::new(Arc::clone(&catalog)));
        refine(oracle, catalog, annotations, config, &args).await?
    } else {
        let oracle = match &args.oracle_url {
            Some(raw) => HttpDiagnosisOracle::new(http_oracle::parse_endpoint(raw)?)?,
            None => HttpDiagnosisOracle::from_env()?,
        };
        stage_info!(Stage::Oracle, endpoint = %oracle.endpoint(), "Using remote diagnosis oracle");
        refine(Arc::new(oracle), catalog, annotations, config, &args).await?
    };

    log_summary(&report);
    files::write_report(&args.output, &report)
        .await
        .with_context(|| format!("writing {}", args.output.display()))?;

    logging::log_success(Stage::Io, "dxrefine finished");
    Ok(())
}

async fn refine<O: DiagnosisOracle + 'static>(
    oracle: Arc<O>,
    catalog: Arc<DiseaseCatalog>,
    annotations: Arc<refiner::AnnotationTable>,
    config: RefinementConfig,
    args: &Args,
) -> anyhow::Result<RefinementReport> {
    let n_diseases = config.n_diseases;
    let orchestrator = SimulationOrchestrator::new(oracle, catalog, annotations, config)?;

    let profile = files::load_profile(&args.sample).await.context("loading sample")?;
    let baseline = match &args.baseline {
        Some(path) => files::load_baseline(path).await.context("loading baseline")?,
        None => orchestrator
            .baseline(&profile)
            .await
            .context("computing baseline ranking")?,
    };

    let request = if args.targets.is_empty() {
        SimulationRequest::with_top_targets(profile, baseline, n_diseases)
    } else {
        SimulationRequest::new(profile, baseline, args.targets.clone())
    };

    // Set up cancellation on Ctrl+C
    let cancel = orchestrator.get_cancel_handle();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_progress(Stage::Simulation, "Interrupted", "cancelling refinement run");
                cancel.cancel();
            }
            Err(err) => logging::log_error(Stage::Simulation, "Signal handling", &err),
        }
    });

    Ok(orchestrator.run(request).await?)
}

fn log_summary(report: &RefinementReport) {
    for (position, score) in report.ranking.iter().enumerate() {
        stage_info!(
            Stage::Aggregation,
            "{:>3}. {} utility={:.4} status={:?} repetitions={}/{}",
            position + 1,
            score.test.display(),
            score.utility,
            score.status,
            score.repetitions.completed,
            score.repetitions.requested
        );
    }
    for skipped in &report.skipped {
        stage_debug!(Stage::Aggregation, "skipped {} ({:?})", skipped.test.display(), skipped.reason);
    }
}
