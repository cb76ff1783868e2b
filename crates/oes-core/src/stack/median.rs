use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{PipelineError, Result};
use crate::frame::Image;

use super::check_dimensions;

/// Per-pixel median across a set of equally sized images.
///
/// Uses `select_nth_unstable` for O(n) median without a full sort. Even
/// counts average the two middle values. Rows are processed in parallel for
/// images of at least `PARALLEL_PIXEL_THRESHOLD` pixels. The result depends
/// only on the input values, so the same inputs give bitwise-identical output.
pub fn median_combine(images: &[Image]) -> Result<Array2<f32>> {
    if images.is_empty() {
        return Err(PipelineError::EmptyGroup("median input".into()));
    }
    let (h, w) = check_dimensions(images)?;
    let n = images.len();

    let mut result = Array2::<f32>::zeros((h, w));
    let fill_row = |row: usize, out: &mut [f32]| {
        let mut values = vec![0.0f32; n];
        for (col, slot) in out.iter_mut().enumerate() {
            for (v, image) in values.iter_mut().zip(images) {
                *v = image.data[[row, col]];
            }
            *slot = median_of(&mut values);
        }
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        result
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, mut lane)| {
                if let Some(out) = lane.as_slice_mut() {
                    fill_row(row, out);
                }
            });
    } else {
        for (row, mut lane) in result.axis_iter_mut(Axis(0)).enumerate() {
            if let Some(out) = lane.as_slice_mut() {
                fill_row(row, out);
            }
        }
    }

    Ok(result)
}

pub(crate) fn median_of(values: &mut [f32]) -> f32 {
    let n = values.len();
    match n {
        0 => 0.0,
        1 => values[0],
        _ if n % 2 == 1 => *values.select_nth_unstable_by(n / 2, |a, b| a.total_cmp(b)).1,
        _ => {
            let mid = n / 2;
            let (lower, upper, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
            let upper = *upper;
            let lower_max = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            (lower_max + upper) / 2.0
        }
    }
}
