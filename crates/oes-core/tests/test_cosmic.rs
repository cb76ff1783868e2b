use ndarray::Array2;

use oes_core::engine::cosmic::{detect_cosmic_rays, reject_cosmic_rays};
use oes_core::engine::CosmicRayParams;

fn background(value: f32) -> Array2<f32> {
    Array2::from_elem((15, 15), value)
}

#[test]
fn test_single_hot_pixel_replaced() {
    let mut data = background(100.0);
    data[[7, 7]] = 1000.0;

    let hits = detect_cosmic_rays(&data, &CosmicRayParams::default());
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].row, hits[0].col), (7, 7));
    assert_eq!(hits[0].original, 1000.0);
    assert_eq!(hits[0].replacement, 100.0);

    let replaced = reject_cosmic_rays(&mut data, &CosmicRayParams::default());
    assert_eq!(replaced, 1);
    assert!(data.iter().all(|&v| v == 100.0));
}

#[test]
fn test_star_kept() {
    // Peak with flux spread into its neighbors.
    let mut data = background(100.0);
    for r in 6..=8 {
        for c in 6..=8 {
            data[[r, c]] = 600.0;
        }
    }
    data[[7, 7]] = 1000.0;
    let before = data.clone();

    assert!(detect_cosmic_rays(&data, &CosmicRayParams::default()).is_empty());
    assert_eq!(reject_cosmic_rays(&mut data, &CosmicRayParams::default()), 0);
    assert_eq!(data, before);
}

#[test]
fn test_below_threshold_kept() {
    let mut data = background(100.0);
    data[[7, 7]] = 120.0;
    assert!(detect_cosmic_rays(&data, &CosmicRayParams::default()).is_empty());

    let params = CosmicRayParams {
        threshold: 10.0,
        ..Default::default()
    };
    assert_eq!(detect_cosmic_rays(&data, &params).len(), 1);
}

#[test]
fn test_edge_pixels_not_candidates() {
    let mut data = background(100.0);
    data[[1, 1]] = 5000.0;
    data[[14, 7]] = 5000.0;
    assert!(detect_cosmic_rays(&data, &CosmicRayParams::default()).is_empty());
}

#[test]
fn test_image_smaller_than_window() {
    let mut data = Array2::from_elem((5, 5), 10.0f32);
    data[[2, 2]] = 9000.0;
    assert!(detect_cosmic_rays(&data, &CosmicRayParams::default()).is_empty());
}

#[test]
fn test_several_hits() {
    let mut data = Array2::from_elem((40, 40), 50.0f32);
    let spots = [(5, 5), (20, 31), (34, 12)];
    for &(r, c) in &spots {
        data[[r, c]] = 3000.0;
    }
    let mut hits: Vec<(usize, usize)> = detect_cosmic_rays(&data, &CosmicRayParams::default())
        .iter()
        .map(|h| (h.row, h.col))
        .collect();
    hits.sort();
    assert_eq!(hits, spots);
}

#[test]
fn test_blank_pixels_do_not_trigger_hits() {
    let mut data = background(100.0);
    data[[7, 7]] = f32::NAN;
    data[[8, 9]] = 101.0;
    data[[2, 12]] = f32::INFINITY;
    let before = data.clone();

    assert!(detect_cosmic_rays(&data, &CosmicRayParams::default()).is_empty());
    assert_eq!(reject_cosmic_rays(&mut data, &CosmicRayParams::default()), 0);
    assert!(data[[7, 7]].is_nan());
    assert_eq!(data[[4, 4]], before[[4, 4]]);
    assert_eq!(data[[8, 9]], 101.0);
}

#[test]
fn test_hit_found_away_from_blank_pixel() {
    let mut data = Array2::from_elem((30, 30), 100.0f32);
    data[[3, 3]] = f32::NAN;
    data[[20, 20]] = 2000.0;

    let hits = detect_cosmic_rays(&data, &CosmicRayParams::default());
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].row, hits[0].col), (20, 20));
    assert_eq!(hits[0].replacement, 100.0);
}

#[test]
fn test_params_validate() {
    assert!(CosmicRayParams::default().validate().is_ok());
    let even = CosmicRayParams {
        window: 6,
        ..Default::default()
    };
    assert!(even.validate().is_err());
    let zero_ratio = CosmicRayParams {
        flux_ratio: 0.0,
        ..Default::default()
    };
    assert!(zero_ratio.validate().is_err());
    let nan = CosmicRayParams {
        threshold: f32::NAN,
        ..Default::default()
    };
    assert!(nan.validate().is_err());
}
