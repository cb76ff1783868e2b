use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use oes_core::engine::NativeEngine;
use oes_core::pipeline::config::PipelineConfig;
use oes_core::pipeline::{run_night_reported, NightStage, ProgressReporter};
use tracing::info;

use crate::summary::{print_night_report, print_run_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Night directory with raw exposures
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory (must be empty or absent)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extension for written files
    #[arg(long)]
    pub ext: Option<String>,

    /// Process flats, comps and objects one after another
    #[arg(long)]
    pub sequential: bool,

    /// Per-call reduction engine timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory for scratch list files
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

/// Drives a spinner from pipeline stage events.
struct SpinnerReporter {
    pb: ProgressBar,
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: NightStage, total_items: Option<usize>) {
        match total_items {
            Some(n) => self.pb.set_message(format!("{stage} ({n})")),
            None => self.pb.set_message(stage.to_string()),
        }
    }

    fn advance(&self, _stage: NightStage, _items_done: usize) {
        self.pb.tick();
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    print_run_summary(&config);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    let reporter = Arc::new(SpinnerReporter { pb: pb.clone() });

    let result = run_night_reported(&config, Arc::new(NativeEngine::new()), reporter);
    pb.finish_and_clear();

    let report = result.with_context(|| format!("Night {} failed", config.input.display()))?;
    print_night_report(&report);
    info!(
        night = %report.night_id,
        processed = report.processed().count(),
        "Night run finished"
    );

    let failures = report.failures().count();
    if failures > 0 {
        bail!("{failures} frame group(s) failed calibration");
    }
    Ok(())
}

fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str::<PipelineConfig>(&contents).context("Invalid pipeline config")?
    } else {
        match (&args.input, &args.output) {
            (Some(input), Some(output)) => PipelineConfig::new(input, output),
            _ => bail!("--input and --output are required without --config"),
        }
    };

    if let Some(ref input) = args.input {
        config.input = input.clone();
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }
    if let Some(ref ext) = args.ext {
        config.extension = ext.clone();
    }
    if args.sequential {
        config.parallel_branches = false;
    }
    if args.timeout.is_some() {
        config.engine.timeout_secs = args.timeout;
    }
    if args.scratch_dir.is_some() {
        config.engine.scratch_dir = args.scratch_dir.clone();
    }

    config.validate().context("Invalid pipeline config")?;
    Ok(config)
}
