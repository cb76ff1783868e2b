use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::Image;
use crate::io::fits::read_image;
use crate::io::fits_writer::write_image;
use crate::stack::mean::mean_combine;
use crate::stack::median::median_combine;

use super::cosmic::reject_cosmic_rays;
use super::scratch::read_list;
use super::{CombineStatistic, CosmicRayParams, FileList, ReductionEngine};

/// In-process reduction engine on `ndarray` + `rayon`, reading and writing FITS.
///
/// Resolves its inputs from the list files it is handed, the same way a
/// list-file driven external toolkit would.
#[derive(Clone, Debug, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ReductionEngine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    fn combine(
        &self,
        inputs: &FileList,
        output: &Path,
        statistic: CombineStatistic,
    ) -> Result<()> {
        combine_impl(inputs, output, statistic).map_err(|e| PipelineError::engine("combine", e))
    }

    fn subtract(&self, inputs: &FileList, reference: &Path, outputs: &FileList) -> Result<()> {
        subtract_impl(inputs, reference, outputs).map_err(|e| PipelineError::engine("subtract", e))
    }

    fn reject_cosmic_rays(
        &self,
        inputs: &FileList,
        outputs: &FileList,
        params: &CosmicRayParams,
    ) -> Result<()> {
        cosmic_impl(inputs, outputs, params)
            .map_err(|e| PipelineError::engine("reject-cosmic-rays", e))
    }
}

fn combine_impl(inputs: &FileList, output: &Path, statistic: CombineStatistic) -> Result<()> {
    let paths = read_list(inputs.path())?;
    if paths.is_empty() {
        return Err(PipelineError::EmptyGroup("combine input".into()));
    }

    let images: Vec<Image> = paths
        .par_iter()
        .map(|p| read_image(p))
        .collect::<Result<_>>()?;

    let data = match statistic {
        CombineStatistic::Median => median_combine(&images)?,
        CombineStatistic::Mean => mean_combine(&images)?,
    };

    let mut header = images[0].header.clone();
    header.push_history(&format!("{statistic} combine of {} frames", images.len()));
    write_image(&Image::new(data, header), output)?;

    debug!(frames = images.len(), %statistic, output = %output.display(), "Combined");
    Ok(())
}

fn subtract_impl(inputs: &FileList, reference: &Path, outputs: &FileList) -> Result<()> {
    let pairs = paired(inputs, outputs)?;
    let reference_image = read_image(reference)?;
    let reference_name = reference
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    pairs.par_iter().try_for_each(|(input, output)| {
        let mut image = read_image(input)?;
        if image.dim() != reference_image.dim() {
            return Err(PipelineError::DimensionMismatch {
                expected: reference_image.dim(),
                actual: image.dim(),
            });
        }
        image.data -= &reference_image.data;
        image.header.push_history(&format!("subtracted {reference_name}"));
        write_image(&image, output)
    })?;

    debug!(frames = pairs.len(), reference = %reference.display(), "Subtracted");
    Ok(())
}

fn cosmic_impl(inputs: &FileList, outputs: &FileList, params: &CosmicRayParams) -> Result<()> {
    if params.interactive {
        return Err(PipelineError::Config(
            "interactive cosmic-ray review is not available in batch runs".into(),
        ));
    }
    params.validate()?;
    let pairs = paired(inputs, outputs)?;

    pairs.par_iter().try_for_each(|(input, output)| {
        let mut image = read_image(input)?;
        let replaced = reject_cosmic_rays(&mut image.data, params);
        image.header.push_history(&format!(
            "cosmic rays: {replaced} px replaced (window {}, flux ratio {})",
            params.window, params.flux_ratio
        ));
        debug!(input = %input.display(), replaced, "Cosmic rays rejected");
        write_image(&image, output)
    })
}

/// Zip the input and output lists, which must be the same length.
fn paired(inputs: &FileList, outputs: &FileList) -> Result<Vec<(PathBuf, PathBuf)>> {
    let sources = read_list(inputs.path())?;
    let targets = read_list(outputs.path())?;
    if sources.len() != targets.len() {
        return Err(PipelineError::Config(format!(
            "{} inputs but {} outputs",
            sources.len(),
            targets.len()
        )));
    }
    Ok(sources.into_iter().zip(targets).collect())
}
