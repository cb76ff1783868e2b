//! The image reduction capability the pipeline delegates pixel work to.
//!
//! The pipeline only sees [`ReductionEngine`]. Inputs and outputs travel as
//! scratch list files ([`FileList`]), one path per line, so an engine may be
//! an in-process implementation or a wrapper around an external toolkit
//! that takes `@list` arguments.

pub mod cosmic;
pub mod native;
pub mod scratch;
pub mod timeout;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{COSMIC_RAY_FLUX_RATIO, COSMIC_RAY_THRESHOLD, COSMIC_RAY_WINDOW};
use crate::error::{PipelineError, Result};

pub use native::NativeEngine;
pub use scratch::{read_list, FileList, ScratchSpace};
pub use timeout::TimeoutEngine;

/// Per-pixel statistic used when combining an image set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineStatistic {
    #[default]
    Median,
    Mean,
}

impl fmt::Display for CombineStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Median => write!(f, "median"),
            Self::Mean => write!(f, "mean"),
        }
    }
}

/// Cosmic-ray detection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmicRayParams {
    /// Minimum excess over the local background (ADU).
    pub threshold: f32,
    /// Neighbor-to-candidate flux ratio (percent) below which a candidate is
    /// a cosmic ray rather than a star.
    pub flux_ratio: f32,
    /// Detection window side length in pixels (odd).
    pub window: usize,
    /// Interactive review of detections. Not supported by batch runs.
    pub interactive: bool,
}

impl Default for CosmicRayParams {
    fn default() -> Self {
        Self {
            threshold: COSMIC_RAY_THRESHOLD,
            flux_ratio: COSMIC_RAY_FLUX_RATIO,
            window: COSMIC_RAY_WINDOW,
            interactive: false,
        }
    }
}

impl CosmicRayParams {
    pub fn validate(&self) -> Result<()> {
        if self.window < 3 || self.window % 2 == 0 {
            return Err(PipelineError::Config(format!(
                "cosmic-ray window must be an odd size >= 3, got {}",
                self.window
            )));
        }
        let usable = |v: f32| v.is_finite() && v >= 0.0;
        if !usable(self.threshold) || !usable(self.flux_ratio) || self.flux_ratio == 0.0 {
            return Err(PipelineError::Config(
                "cosmic-ray threshold must be >= 0 and flux ratio > 0".into(),
            ));
        }
        Ok(())
    }
}

/// The three image operations the night pipeline needs.
///
/// Implementations must be safe to call from several branches at once; the
/// pipeline keeps at most one call in flight per frame group.
pub trait ReductionEngine: Send + Sync {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Combine every image in `inputs` into one image written to `output`.
    fn combine(&self, inputs: &FileList, output: &Path, statistic: CombineStatistic)
        -> Result<()>;

    /// Write `inputs[i] - reference` to `outputs[i]` for every i.
    fn subtract(&self, inputs: &FileList, reference: &Path, outputs: &FileList) -> Result<()>;

    /// Write a cosmic-ray cleaned copy of `inputs[i]` to `outputs[i]`.
    fn reject_cosmic_rays(
        &self,
        inputs: &FileList,
        outputs: &FileList,
        params: &CosmicRayParams,
    ) -> Result<()>;
}
