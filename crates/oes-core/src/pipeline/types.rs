use std::path::PathBuf;

use crate::error::PipelineError;
use crate::frame::{Frame, MasterCalibrationFrame, ProcessedFrame, ProcessingStage};

/// Night pipeline stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NightStage {
    Classify,
    BuildMaster,
    ProcessFlats,
    ProcessComps,
    ProcessObjects,
}

impl std::fmt::Display for NightStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classify => write!(f, "Classifying frames"),
            Self::BuildMaster => write!(f, "Building master zero"),
            Self::ProcessFlats => write!(f, "Processing flats"),
            Self::ProcessComps => write!(f, "Processing comps"),
            Self::ProcessObjects => write!(f, "Processing objects"),
        }
    }
}

/// Thread-safe progress reporting for the night pipeline.
///
/// The processing branches may run concurrently, so stages can interleave.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A stage has started. `total_items` is its work item count, if known.
    fn begin_stage(&self, _stage: NightStage, _total_items: Option<usize>) {}

    /// `items_done` work items of `stage` have completed.
    fn advance(&self, _stage: NightStage, _items_done: usize) {}

    /// The stage is finished, successfully or not.
    fn finish_stage(&self, _stage: NightStage) {}
}

/// No-op progress reporter, used when `run_night` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// A raw file that could not be classified.
#[derive(Debug)]
pub struct ClassificationFailure {
    pub path: PathBuf,
    pub error: PipelineError,
}

/// A frame group that failed inside a processing branch.
#[derive(Debug)]
pub struct GroupFailure {
    pub group: String,
    pub error: PipelineError,
}

/// Outcome of one `PROCESS_*` branch.
#[derive(Debug)]
pub struct BranchReport {
    pub stage: NightStage,
    pub groups: usize,
    pub processed: Vec<ProcessedFrame>,
    pub failures: Vec<GroupFailure>,
}

impl BranchReport {
    pub(super) fn new(stage: NightStage) -> Self {
        Self {
            stage,
            groups: 0,
            processed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn count(&self, stage: ProcessingStage) -> usize {
        self.processed.iter().filter(|p| p.stage == stage).count()
    }
}

/// Everything a completed night run produced.
#[derive(Debug)]
pub struct NightReport {
    pub night_id: String,
    pub master: MasterCalibrationFrame,
    pub branches: Vec<BranchReport>,
    pub rejected: Vec<ClassificationFailure>,
    /// Classified frames no branch consumes (dark, domeflat).
    pub skipped: Vec<Frame>,
}

impl NightReport {
    /// True when every branch processed all of its groups.
    pub fn is_success(&self) -> bool {
        self.branches.iter().all(BranchReport::is_success)
    }

    pub fn branch(&self, stage: NightStage) -> Option<&BranchReport> {
        self.branches.iter().find(|b| b.stage == stage)
    }

    pub fn processed(&self) -> impl Iterator<Item = &ProcessedFrame> {
        self.branches.iter().flat_map(|b| b.processed.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &GroupFailure> {
        self.branches.iter().flat_map(|b| b.failures.iter())
    }
}
