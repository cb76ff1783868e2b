use ndarray::Array2;

use crate::error::{PipelineError, Result};
use crate::frame::Image;

use super::check_dimensions;

/// Per-pixel mean across a set of equally sized images.
pub fn mean_combine(images: &[Image]) -> Result<Array2<f32>> {
    if images.is_empty() {
        return Err(PipelineError::EmptyGroup("mean input".into()));
    }
    let dim = check_dimensions(images)?;

    let mut sum = Array2::<f32>::zeros(dim);
    for image in images {
        sum += &image.data;
    }
    sum /= images.len() as f32;

    Ok(sum)
}
