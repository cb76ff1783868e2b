use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, normalize_object_name};
use crate::error::{PipelineError, Result};
use crate::io::fits::FitsHeader;

/// Observation category assigned to a raw exposure by classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Zero,
    Flat,
    Comp,
    Dark,
    Object,
    DomeFlat,
}

impl ImageType {
    /// Subfolder / log name, matching the header spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Flat => "flat",
            Self::Comp => "comp",
            Self::Dark => "dark",
            Self::Object => "object",
            Self::DomeFlat => "domeflat",
        }
    }

    /// Output filename initial for types the calibration processor handles.
    pub fn initial(&self) -> Option<char> {
        match self {
            Self::Flat => Some('f'),
            Self::Comp => Some('c'),
            Self::Object => Some('o'),
            _ => None,
        }
    }

    /// Whether calibrated frames of this type go through cosmic-ray rejection.
    /// Flats never do.
    pub fn needs_cosmic_ray_rejection(&self) -> bool {
        !matches!(self, Self::Flat)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header fields the pipeline reads from each exposure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameMetadata {
    /// IMAGETYP
    pub image_type: Option<String>,
    /// OBJECT, exactly as stored (trailing blanks stripped per FITS rules)
    pub object: Option<String>,
    /// DATE-OBS
    pub date_obs: Option<String>,
    /// UT
    pub ut: Option<String>,
}

impl FrameMetadata {
    pub fn from_header(header: &FitsHeader) -> Self {
        Self {
            image_type: header.get_string("IMAGETYP").map(str::to_string),
            object: header.get_string("OBJECT").map(str::to_string),
            date_obs: header.get_string("DATE-OBS").map(str::to_string),
            ut: header.get_string("UT").map(str::to_string),
        }
    }
}

/// One classified raw exposure.
///
/// Only constructible through classification, so the image type is always
/// assigned before the frame can join a group.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    path: PathBuf,
    image_type: ImageType,
    object_name: Option<String>,
    night_id: String,
    metadata: FrameMetadata,
}

impl Frame {
    /// Classify `metadata` and build the frame record.
    pub fn from_metadata(path: &Path, night_id: &str, metadata: FrameMetadata) -> Result<Self> {
        let image_type = classify(path, &metadata)?;
        let object_name = match image_type {
            ImageType::Object => Some(normalize_object_name(
                metadata.object.as_deref().unwrap_or_default(),
            )),
            _ => None,
        };
        Ok(Self {
            path: path.to_path_buf(),
            image_type,
            object_name,
            night_id: night_id.to_string(),
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn night_id(&self) -> &str {
        &self.night_id
    }

    pub fn metadata(&self) -> &FrameMetadata {
        &self.metadata
    }

    /// File stem used to derive output names.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Ordered, immutable set of frames sharing night, type and (for objects) name.
#[derive(Clone, Debug)]
pub struct FrameGroup {
    night_id: String,
    image_type: ImageType,
    object_name: Option<String>,
    frames: Vec<Frame>,
}

impl FrameGroup {
    /// Build a group, ordering frames by path. Every frame must match the
    /// group key; an empty group is allowed here and rejected at combine time.
    pub fn new(
        night_id: &str,
        image_type: ImageType,
        object_name: Option<String>,
        mut frames: Vec<Frame>,
    ) -> Result<Self> {
        let expected = match &object_name {
            Some(name) => format!("{image_type}/{name}"),
            None => image_type.to_string(),
        };
        for frame in &frames {
            let key_matches = frame.image_type == image_type
                && frame.object_name == object_name
                && frame.night_id == night_id;
            if !key_matches {
                let actual = match &frame.object_name {
                    Some(name) => format!("{}/{name}", frame.image_type),
                    None => frame.image_type.to_string(),
                };
                return Err(PipelineError::TypeMismatch { expected, actual });
            }
        }
        frames.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self {
            night_id: night_id.to_string(),
            image_type,
            object_name,
            frames,
        })
    }

    pub fn night_id(&self) -> &str {
        &self.night_id
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|f| f.path.clone()).collect()
    }

    /// Human-readable label for logs, e.g. `object/HD12345`.
    pub fn label(&self) -> String {
        match &self.object_name {
            Some(name) => format!("{}/{name}", self.image_type),
            None => self.image_type.to_string(),
        }
    }
}

/// The night's combined zero frame. Read-only once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MasterCalibrationFrame {
    night_id: String,
    path: PathBuf,
    source_count: usize,
}

impl MasterCalibrationFrame {
    pub(crate) fn new(night_id: &str, path: PathBuf, source_count: usize) -> Self {
        Self {
            night_id: night_id.to_string(),
            path,
            source_count,
        }
    }

    pub fn night_id(&self) -> &str {
        &self.night_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of zero frames that went into the median.
    pub fn source_count(&self) -> usize {
        self.source_count
    }
}

/// How far along calibration a written frame is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    BiasSubtracted,
    CosmicRayCleaned,
}

impl ProcessingStage {
    /// Filename marker following the type initial: `z_` or `zc_`.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::BiasSubtracted => "z_",
            Self::CosmicRayCleaned => "zc_",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BiasSubtracted => write!(f, "bias-subtracted"),
            Self::CosmicRayCleaned => write!(f, "cosmic-ray-cleaned"),
        }
    }
}

/// One calibrated output file and the raw frame it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedFrame {
    pub source: PathBuf,
    pub stage: ProcessingStage,
    pub path: PathBuf,
}

/// In-memory pixel data in raw ADU, with the header it was read with.
#[derive(Clone, Debug)]
pub struct Image {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    pub header: FitsHeader,
}

impl Image {
    pub fn new(data: Array2<f32>, header: FitsHeader) -> Self {
        Self { data, header }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}
