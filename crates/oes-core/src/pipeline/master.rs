use std::fs;
use std::io::ErrorKind;

use tracing::{error, info};

use crate::consts::MASTER_ZERO_STEM;
use crate::engine::CombineStatistic;
use crate::error::{PipelineError, Result};
use crate::frame::{FrameGroup, ImageType, MasterCalibrationFrame};

use super::context::CalibrationContext;

/// Median-combine the night's zero frames into `mzero.<ext>`.
///
/// An empty group is `MissingCalibrationData`. If the engine fails, any
/// partially written master file is removed before the error propagates.
/// With a timeout configured the engine writes to a staged file, so a call
/// that overruns never produces `mzero` afterwards.
pub fn build_master(
    ctx: &CalibrationContext,
    zero_group: &FrameGroup,
) -> Result<MasterCalibrationFrame> {
    if zero_group.image_type() != ImageType::Zero {
        return Err(PipelineError::TypeMismatch {
            expected: ImageType::Zero.to_string(),
            actual: zero_group.label(),
        });
    }
    if zero_group.is_empty() {
        return Err(PipelineError::MissingCalibrationData {
            night_id: zero_group.night_id().to_string(),
        });
    }

    let output = ctx.output_path(MASTER_ZERO_STEM);
    let inputs = ctx.scratch.list(&zero_group.paths())?;

    info!(
        frames = zero_group.len(),
        engine = ctx.engine.name(),
        "Combining zero frames"
    );
    if let Err(e) = ctx
        .engine
        .combine(&inputs, &output, CombineStatistic::Median)
    {
        error!(error = %e, "Master zero combine failed");
        match fs::remove_file(&output) {
            Ok(()) => {}
            Err(rm) if rm.kind() == ErrorKind::NotFound => {}
            Err(rm) => error!(path = %output.display(), error = %rm, "Could not remove partial master"),
        }
        return Err(e);
    }

    info!(output = %output.display(), "Master zero built");
    Ok(MasterCalibrationFrame::new(
        zero_group.night_id(),
        output,
        zero_group.len(),
    ))
}
