use std::path::Path;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::{Frame, FrameMetadata, ImageType};
use crate::io::fits::read_header;

/// Object name that marks an `object` exposure as a dome flat.
const DOMEFLAT_OBJECT: &str = "domeflat";

/// Assign an image type from the IMAGETYP and OBJECT header fields.
///
/// `comp`, `flat`, `zero` and `dark` map verbatim. `object` becomes
/// `domeflat` when OBJECT is exactly `domeflat` (case-sensitive, untrimmed).
/// Anything else, including a missing IMAGETYP, is rejected.
pub fn classify(path: &Path, metadata: &FrameMetadata) -> Result<ImageType> {
    let Some(value) = metadata.image_type.as_deref() else {
        return Err(PipelineError::UnrecognizedFrameType {
            path: path.to_path_buf(),
            value: "<missing IMAGETYP>".into(),
        });
    };

    match value {
        "comp" => Ok(ImageType::Comp),
        "flat" => Ok(ImageType::Flat),
        "zero" => Ok(ImageType::Zero),
        "dark" => Ok(ImageType::Dark),
        "object" if metadata.object.as_deref() == Some(DOMEFLAT_OBJECT) => {
            Ok(ImageType::DomeFlat)
        }
        "object" => Ok(ImageType::Object),
        other => Err(PipelineError::UnrecognizedFrameType {
            path: path.to_path_buf(),
            value: other.to_string(),
        }),
    }
}

/// Trim an OBJECT value and collapse each whitespace run to one underscore.
pub fn normalize_object_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Read a FITS header from disk and classify the exposure.
pub fn classify_file(path: &Path, night_id: &str) -> Result<Frame> {
    let header = read_header(path)?;
    let metadata = FrameMetadata::from_header(&header);
    let frame = Frame::from_metadata(path, night_id, metadata)?;
    debug!(
        path = %path.display(),
        image_type = %frame.image_type(),
        object = frame.object_name().unwrap_or("-"),
        "Classified frame"
    );
    Ok(frame)
}
