use ndarray::Array2;
use rayon::prelude::*;

use crate::stack::median::median_of;

use super::CosmicRayParams;

/// A pixel flagged as a cosmic-ray hit and the value replacing it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CosmicRayHit {
    pub row: usize,
    pub col: usize,
    pub original: f32,
    pub replacement: f32,
}

/// Find cosmic-ray hits without modifying the image.
///
/// A pixel is a candidate when it is the maximum of its `window x window`
/// neighborhood and exceeds the neighborhood mean (candidate excluded) by more
/// than `threshold`. The candidate is a hit when the mean of its 8 adjacent
/// pixels, relative to that background, carries less than `flux_ratio`
/// percent of the candidate's excess. Stars spread flux into their neighbors;
/// cosmic rays do not. Pixels closer than half a window to the edge are never
/// candidates, and neither are pixels whose window holds a non-finite value.
pub fn detect_cosmic_rays(data: &Array2<f32>, params: &CosmicRayParams) -> Vec<CosmicRayHit> {
    let (h, w) = data.dim();
    let half = params.window / 2;
    if params.window < 3 || h < params.window || w < params.window {
        return Vec::new();
    }

    (half..h - half)
        .into_par_iter()
        .flat_map_iter(|row| {
            let mut others = Vec::with_capacity(params.window * params.window - 1);
            let mut hits = Vec::new();
            for col in half..w - half {
                if let Some(hit) = examine(data, row, col, half, params, &mut others) {
                    hits.push(hit);
                }
            }
            hits
        })
        .collect()
}

/// Detect and replace cosmic-ray hits in place. Returns the number replaced.
pub fn reject_cosmic_rays(data: &mut Array2<f32>, params: &CosmicRayParams) -> usize {
    let hits = detect_cosmic_rays(data, params);
    for hit in &hits {
        data[[hit.row, hit.col]] = hit.replacement;
    }
    hits.len()
}

fn examine(
    data: &Array2<f32>,
    row: usize,
    col: usize,
    half: usize,
    params: &CosmicRayParams,
    others: &mut Vec<f32>,
) -> Option<CosmicRayHit> {
    let candidate = data[[row, col]];
    if !candidate.is_finite() {
        return None;
    }

    others.clear();
    for r in row - half..=row + half {
        for c in col - half..=col + half {
            if r == row && c == col {
                continue;
            }
            let v = data[[r, c]];
            // Blank (NaN) or overflowed pixels leave no usable background.
            if !v.is_finite() || v > candidate {
                return None;
            }
            others.push(v);
        }
    }

    let background = others.iter().sum::<f32>() / others.len() as f32;
    let excess = candidate - background;
    if excess.is_nan() || excess <= params.threshold || excess <= 0.0 {
        return None;
    }

    let mut adjacent = 0.0f32;
    for r in row - 1..=row + 1 {
        for c in col - 1..=col + 1 {
            if r != row || c != col {
                adjacent += data[[r, c]];
            }
        }
    }
    let adjacent = adjacent / 8.0;

    let ratio = 100.0 * (adjacent - background) / excess;
    if ratio.is_nan() || ratio >= params.flux_ratio {
        return None;
    }

    Some(CosmicRayHit {
        row,
        col,
        original: candidate,
        replacement: median_of(others),
    })
}
