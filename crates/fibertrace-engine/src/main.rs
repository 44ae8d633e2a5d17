//! Stand-in simulation engine for fibertrace.
//!
//! Drives the analysis core the way a particle-transport engine would: it
//! owns the worker threads, feeds each worker the steps of its events, and
//! calls the run lifecycle hooks at run boundaries.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `FIBERTRACE_CONFIG` or `fibertrace-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build and freeze the counter registry, create the shared hit log
//! 4. Pick the step source (replay file or synthetic generator)
//! 5. Execute `engine.runs` runs, printing each run summary

mod driver;
mod error;
mod source;

use std::path::PathBuf;

use fibertrace_core::config::AnalysisConfig;
use fibertrace_types::RunId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::driver::Engine;
use crate::error::EngineError;
use crate::source::{ReplaySource, StepSource, SyntheticSource};

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "FIBERTRACE_CONFIG";

/// Configuration file used when `FIBERTRACE_CONFIG` is unset.
const DEFAULT_CONFIG_FILE: &str = "fibertrace-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the step source, or a run fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. The log level lives in it, so logging starts after.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("fibertrace-engine starting");
    let config_source = config_path
        .as_ref()
        .map_or_else(|| "defaults".to_owned(), |path| path.display().to_string());
    info!(source = %config_source, "Configuration loaded");
    info!(
        workers = config.engine.workers,
        runs = config.engine.runs,
        output_dir = %config.report.output_dir.display(),
        bin_width_ns = config.report.bin_width_ns,
        histograms = config.histograms.enabled,
        "Engine configured"
    );

    // 3. Step source.
    let mut source = build_source(&config)?;

    // 4. Registry and hit log.
    let engine = Engine::new(config);

    // 5. Runs.
    let mut total_hits = 0_usize;
    for run in 0..engine.config().engine.runs {
        let run_id = RunId::new(run);
        let events = source.events(run_id)?;
        let summary = engine.execute_run(run_id, &events)?;
        total_hits = total_hits.saturating_add(summary.hit_count);
        println!("{summary}");
    }

    info!(
        runs = engine.config().engine.runs,
        total_hits, "fibertrace-engine shutdown complete"
    );
    Ok(())
}

/// Load the analysis configuration.
///
/// Reads the file named by `FIBERTRACE_CONFIG`, or `fibertrace-config.yaml`
/// in the working directory. Returns the path that was read, or `None`
/// when no file exists and defaults are used.
fn load_config() -> Result<(AnalysisConfig, Option<PathBuf>), EngineError> {
    let config_path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    if config_path.exists() {
        let config = AnalysisConfig::from_file(&config_path)?;
        Ok((config, Some(config_path)))
    } else {
        let mut config = AnalysisConfig::default();
        config.report.apply_env_overrides();
        Ok((config, None))
    }
}

/// Replay file when configured, otherwise the seeded generator.
fn build_source(config: &AnalysisConfig) -> Result<Box<dyn StepSource>, EngineError> {
    match &config.engine.replay {
        Some(path) => {
            let replay = ReplaySource::from_file(path)?;
            if replay.is_empty() {
                warn!(path = %path.display(), "Replay file holds no events");
            }
            info!(path = %path.display(), events = replay.len(), "Replaying recorded steps");
            Ok(Box::new(replay))
        }
        None => {
            info!(
                seed = config.engine.seed,
                events_per_run = config.engine.events_per_run,
                "Generating synthetic photon tracks"
            );
            Ok(Box::new(SyntheticSource::new(
                config.engine.seed,
                config.engine.events_per_run,
            )))
        }
    }
}
