use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::frame::{Frame, FrameGroup, ImageType, ProcessingStage};

use super::calibrate::output_stem;

/// A night's classified frames, split into the groups the pipeline consumes.
#[derive(Debug)]
pub struct NightFrames {
    pub night_id: String,
    pub zero: FrameGroup,
    pub flats: Option<FrameGroup>,
    pub comps: Option<FrameGroup>,
    /// One group per object name, ordered by name.
    pub objects: Vec<FrameGroup>,
    /// Classified frames with no processing branch (dark, domeflat).
    pub skipped: Vec<Frame>,
}

impl NightFrames {
    /// Group classified frames. The zero group is always present, possibly empty.
    pub fn from_frames(night_id: &str, frames: Vec<Frame>) -> Result<Self> {
        let mut zero = Vec::new();
        let mut flats = Vec::new();
        let mut comps = Vec::new();
        let mut objects: BTreeMap<String, Vec<Frame>> = BTreeMap::new();
        let mut skipped = Vec::new();

        for frame in frames {
            match frame.image_type() {
                ImageType::Zero => zero.push(frame),
                ImageType::Flat => flats.push(frame),
                ImageType::Comp => comps.push(frame),
                ImageType::Object => {
                    let name = frame.object_name().unwrap_or_default().to_string();
                    objects.entry(name).or_default().push(frame);
                }
                ImageType::Dark | ImageType::DomeFlat => skipped.push(frame),
            }
        }

        let optional = |image_type: ImageType, frames: Vec<Frame>| -> Result<Option<FrameGroup>> {
            if frames.is_empty() {
                Ok(None)
            } else {
                FrameGroup::new(night_id, image_type, None, frames).map(Some)
            }
        };

        Ok(Self {
            night_id: night_id.to_string(),
            zero: FrameGroup::new(night_id, ImageType::Zero, None, zero)?,
            flats: optional(ImageType::Flat, flats)?,
            comps: optional(ImageType::Comp, comps)?,
            objects: objects
                .into_iter()
                .map(|(name, frames)| FrameGroup::new(night_id, ImageType::Object, Some(name), frames))
                .collect::<Result<_>>()?,
            skipped,
        })
    }

    /// Groups to calibrate, flats then comps then objects.
    pub fn calibration_groups(&self) -> impl Iterator<Item = &FrameGroup> {
        self.flats
            .iter()
            .chain(self.comps.iter())
            .chain(self.objects.iter())
    }

    /// Fail if two raw frames would be written to the same output name.
    ///
    /// Frames from different object folders can share a file stem.
    pub fn check_output_names(&self) -> Result<()> {
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for group in self.calibration_groups() {
            for frame in group.frames() {
                let Some(name) = output_stem(group.image_type(), ProcessingStage::BiasSubtracted, &frame.stem())
                else {
                    continue;
                };
                if let Some(previous) = seen.insert(name.clone(), frame.path().to_path_buf()) {
                    return Err(PipelineError::Config(format!(
                        "{} and {} both map to output {name}",
                        previous.display(),
                        frame.path().display()
                    )));
                }
            }
        }
        Ok(())
    }
}
