pub mod mean;
pub mod median;

use crate::error::{PipelineError, Result};
use crate::frame::Image;

/// Shared dimensions of a non-empty image set.
pub(crate) fn check_dimensions(images: &[Image]) -> Result<(usize, usize)> {
    let expected = images.first().map(Image::dim).unwrap_or((0, 0));
    for image in images {
        if image.dim() != expected {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: image.dim(),
            });
        }
    }
    Ok(expected)
}
