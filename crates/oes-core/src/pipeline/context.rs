use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::{CosmicRayParams, ReductionEngine, ScratchSpace, TimeoutEngine};

use super::config::PipelineConfig;

/// What the master builder and calibration processor need for one night.
///
/// Built once from the config; shared read-only across branches.
#[derive(Clone)]
pub struct CalibrationContext {
    pub engine: Arc<dyn ReductionEngine>,
    pub scratch: ScratchSpace,
    pub output_dir: PathBuf,
    pub extension: String,
    pub cosmic_rays: CosmicRayParams,
}

impl CalibrationContext {
    /// Wire the engine (with its timeout guard, if configured) to the config.
    pub fn from_config(config: &PipelineConfig, engine: Arc<dyn ReductionEngine>) -> Self {
        let scratch = ScratchSpace::new(config.engine.scratch_dir.clone());
        let engine: Arc<dyn ReductionEngine> = match config.engine.timeout() {
            Some(timeout) => {
                Arc::new(TimeoutEngine::new(engine, timeout).with_scratch(scratch.clone()))
            }
            None => engine,
        };
        Self {
            engine,
            scratch,
            output_dir: config.output.clone(),
            extension: config.extension.clone(),
            cosmic_rays: config.cosmic_rays.clone(),
        }
    }

    /// Path of an output file named `<stem>.<extension>`.
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{}", self.extension))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
