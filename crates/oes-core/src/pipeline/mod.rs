pub mod config;
mod calibrate;
mod context;
mod grouping;
mod master;
mod orchestrator;
mod types;

pub use calibrate::{output_stem, process};
pub use context::CalibrationContext;
pub use grouping::NightFrames;
pub use master::build_master;
pub use orchestrator::{classify_night, run_night, run_night_reported};
pub use types::{
    BranchReport, ClassificationFailure, GroupFailure, NightReport, NightStage, ProgressReporter,
};
