use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use oes_core::pipeline::config::PipelineConfig;
use oes_core::pipeline::{classify_night, ProgressReporter};

use crate::summary::print_classification;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Night directory with raw exposures
    #[arg(short, long)]
    pub input: PathBuf,
}

struct Silent;
impl ProgressReporter for Silent {}

pub fn run(args: &ClassifyArgs) -> Result<()> {
    // Output is never touched by classification.
    let config = PipelineConfig::new(&args.input, PathBuf::new());
    let reporter: Arc<dyn ProgressReporter> = Arc::new(Silent);
    let (night, rejected) = classify_night(&config, &reporter)?;
    print_classification(&night, &rejected);
    Ok(())
}
