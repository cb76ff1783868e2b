/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// File extensions recognized as FITS when scanning a night directory.
pub const FITS_EXTENSIONS: [&str; 3] = ["fit", "fits", "fts"];

/// Default extension for files written by the pipeline.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "fit";

/// File stem of the night's master zero frame.
pub const MASTER_ZERO_STEM: &str = "mzero";

/// Cosmic-ray flux ratio threshold, in percent. Candidates whose neighbors
/// carry less than this fraction of their excess flux are rejected.
pub const COSMIC_RAY_FLUX_RATIO: f32 = 10.0;

/// Side length (pixels) of the cosmic-ray detection window.
pub const COSMIC_RAY_WINDOW: usize = 7;

/// Minimum excess over the local background (ADU) for a cosmic-ray candidate.
pub const COSMIC_RAY_THRESHOLD: f32 = 25.0;

/// Filename prefix for per-invocation scratch list files.
pub const SCRATCH_LIST_PREFIX: &str = "oes-list-";
