use std::path::PathBuf;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::frame::{FrameGroup, ImageType, MasterCalibrationFrame, ProcessedFrame, ProcessingStage};

use super::context::CalibrationContext;

/// Output file stem for a calibrated frame: type initial, stage marker, then
/// the raw stem, e.g. `oz_` / `ozc_`. `None` for types that are never
/// calibrated.
pub fn output_stem(image_type: ImageType, stage: ProcessingStage, raw_stem: &str) -> Option<String> {
    image_type
        .initial()
        .map(|initial| format!("{initial}{}{raw_stem}", stage.marker()))
}

/// Subtract the master zero from every frame in `group`, then clean cosmic
/// rays from the result unless the group is flats.
///
/// Returns the bias-subtracted frames in input order, followed by the cleaned
/// frames in input order when rejection ran. Raw inputs are never touched.
pub fn process(
    ctx: &CalibrationContext,
    group: &FrameGroup,
    image_type: ImageType,
    master: &MasterCalibrationFrame,
) -> Result<Vec<ProcessedFrame>> {
    if group.image_type() != image_type {
        return Err(PipelineError::TypeMismatch {
            expected: image_type.to_string(),
            actual: group.label(),
        });
    }
    if image_type.initial().is_none() {
        return Err(PipelineError::TypeMismatch {
            expected: "flat, comp or object".into(),
            actual: group.label(),
        });
    }
    if group.is_empty() {
        return Err(PipelineError::EmptyGroup(group.label()));
    }
    if group.night_id() != master.night_id() {
        return Err(PipelineError::Config(format!(
            "master zero belongs to night {}, group {} to night {}",
            master.night_id(),
            group.label(),
            group.night_id()
        )));
    }

    let sources = group.paths();
    let subtracted = planned_outputs(ctx, group, image_type, ProcessingStage::BiasSubtracted);

    {
        let inputs = ctx.scratch.list(&sources)?;
        let outputs = ctx.scratch.list(&subtracted)?;
        ctx.engine.subtract(&inputs, master.path(), &outputs)?;
    }

    let mut processed = collect(&sources, &subtracted, ProcessingStage::BiasSubtracted);
    info!(group = %group.label(), frames = group.len(), "Bias subtracted");

    if image_type.needs_cosmic_ray_rejection() {
        let cleaned = planned_outputs(ctx, group, image_type, ProcessingStage::CosmicRayCleaned);
        let inputs = ctx.scratch.list(&subtracted)?;
        let outputs = ctx.scratch.list(&cleaned)?;
        ctx.engine
            .reject_cosmic_rays(&inputs, &outputs, &ctx.cosmic_rays)?;
        processed.extend(collect(&sources, &cleaned, ProcessingStage::CosmicRayCleaned));
        info!(group = %group.label(), frames = group.len(), "Cosmic rays rejected");
    }

    Ok(processed)
}

fn planned_outputs(
    ctx: &CalibrationContext,
    group: &FrameGroup,
    image_type: ImageType,
    stage: ProcessingStage,
) -> Vec<PathBuf> {
    group
        .frames()
        .iter()
        .filter_map(|f| output_stem(image_type, stage, &f.stem()))
        .map(|stem| ctx.output_path(&stem))
        .collect()
}

fn collect(sources: &[PathBuf], outputs: &[PathBuf], stage: ProcessingStage) -> Vec<ProcessedFrame> {
    sources
        .iter()
        .zip(outputs)
        .map(|(source, path)| ProcessedFrame {
            source: source.clone(),
            stage,
            path: path.clone(),
        })
        .collect()
}
