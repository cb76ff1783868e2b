use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_OUTPUT_EXTENSION;
use crate::engine::CosmicRayParams;
use crate::error::{PipelineError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Night directory holding the raw exposures.
    pub input: PathBuf,
    /// Output directory for this night. Must be empty or absent.
    pub output: PathBuf,
    /// Extension for written files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Run the flat, comp and object branches concurrently.
    #[serde(default = "default_parallel")]
    pub parallel_branches: bool,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub cosmic_rays: CosmicRayParams,
}

fn default_extension() -> String {
    DEFAULT_OUTPUT_EXTENSION.to_string()
}

fn default_parallel() -> bool {
    true
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            extension: default_extension(),
            parallel_branches: default_parallel(),
            engine: EngineConfig::default(),
            cosmic_rays: CosmicRayParams::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty()
            || self.extension.starts_with('.')
            || self.extension.contains(['/', '\\'])
        {
            return Err(PipelineError::Config(format!(
                "invalid output extension '{}'",
                self.extension
            )));
        }
        if self.engine.timeout_secs == Some(0) {
            return Err(PipelineError::Config("engine timeout must be positive".into()));
        }
        self.cosmic_rays.validate()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-call deadline for reduction engine operations. None waits forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Directory for scratch list files. None uses the system temp dir.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
