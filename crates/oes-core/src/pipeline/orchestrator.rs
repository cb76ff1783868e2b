use std::fs;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::classify::classify_file;
use crate::engine::ReductionEngine;
use crate::error::{PipelineError, Result};
use crate::frame::{FrameGroup, MasterCalibrationFrame};
use crate::io::scan::{find_fits_files, is_empty_dir, night_id};

use super::calibrate::process;
use super::config::PipelineConfig;
use super::context::CalibrationContext;
use super::grouping::NightFrames;
use super::master::build_master;
use super::types::{
    BranchReport, ClassificationFailure, GroupFailure, NightReport, NightStage, NoOpReporter,
    ProgressReporter,
};

/// Classify every raw file under the night directory.
///
/// Files that cannot be read or classified are returned separately and never
/// enter a group.
pub fn classify_night(
    config: &PipelineConfig,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<(NightFrames, Vec<ClassificationFailure>)> {
    if !config.input.is_dir() {
        return Err(PipelineError::Config(format!(
            "input night {} is not a directory",
            config.input.display()
        )));
    }
    let night = night_id(&config.input);
    let files = find_fits_files(&config.input)?;

    reporter.begin_stage(NightStage::Classify, Some(files.len()));
    let mut frames = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();
    for (i, path) in files.iter().enumerate() {
        match classify_file(path, &night) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unclassifiable frame");
                rejected.push(ClassificationFailure {
                    path: path.clone(),
                    error: e,
                });
            }
        }
        reporter.advance(NightStage::Classify, i + 1);
    }
    reporter.finish_stage(NightStage::Classify);

    let night_frames = NightFrames::from_frames(&night, frames)?;
    info!(
        night = %night,
        zero = night_frames.zero.len(),
        flat = night_frames.flats.as_ref().map_or(0, FrameGroup::len),
        comp = night_frames.comps.as_ref().map_or(0, FrameGroup::len),
        objects = night_frames.objects.len(),
        rejected = rejected.len(),
        "Night classified"
    );
    Ok((night_frames, rejected))
}

/// Run the night pipeline with a thread-safe progress reporter.
///
/// Order: output check, classify, build master, then the flat, comp and
/// object branches. The branches start only after the master is written and
/// run concurrently when `parallel_branches` is set. A branch failure is
/// recorded in the report; a master failure aborts the run.
pub fn run_night_reported(
    config: &PipelineConfig,
    engine: Arc<dyn ReductionEngine>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<NightReport> {
    config.validate()?;
    if !is_empty_dir(&config.output)? {
        return Err(PipelineError::OutputNotEmpty {
            path: config.output.clone(),
        });
    }

    let (night, rejected) = classify_night(config, &reporter)?;
    night.check_output_names()?;
    if night.zero.is_empty() {
        error!(night = %night.night_id, "No zero frames; refusing to calibrate");
        return Err(PipelineError::MissingCalibrationData {
            night_id: night.night_id.clone(),
        });
    }

    fs::create_dir_all(&config.output)?;
    let ctx = CalibrationContext::from_config(config, engine);

    reporter.begin_stage(NightStage::BuildMaster, Some(night.zero.len()));
    let master = build_master(&ctx, &night.zero);
    reporter.finish_stage(NightStage::BuildMaster);
    let master = Arc::new(master?);

    let flats: Vec<&FrameGroup> = night.flats.iter().collect();
    let comps: Vec<&FrameGroup> = night.comps.iter().collect();
    let objects: Vec<&FrameGroup> = night.objects.iter().collect();

    let run = |stage: NightStage, groups: &[&FrameGroup]| run_branch(&ctx, &master, &reporter, stage, groups);
    let branches = if config.parallel_branches {
        let (f, (c, o)) = rayon::join(
            || run(NightStage::ProcessFlats, &flats[..]),
            || {
                rayon::join(
                    || run(NightStage::ProcessComps, &comps[..]),
                    || run(NightStage::ProcessObjects, &objects[..]),
                )
            },
        );
        vec![f, c, o]
    } else {
        vec![
            run(NightStage::ProcessFlats, &flats[..]),
            run(NightStage::ProcessComps, &comps[..]),
            run(NightStage::ProcessObjects, &objects[..]),
        ]
    };

    let report = NightReport {
        night_id: night.night_id,
        master: (*master).clone(),
        branches,
        rejected,
        skipped: night.skipped,
    };
    info!(
        night = %report.night_id,
        processed = report.processed().count(),
        failures = report.failures().count(),
        "Night complete"
    );
    Ok(report)
}

/// Run the night pipeline without progress reporting.
pub fn run_night(config: &PipelineConfig, engine: Arc<dyn ReductionEngine>) -> Result<NightReport> {
    run_night_reported(config, engine, Arc::new(NoOpReporter))
}

/// Calibrate each group of one branch in turn. A failing group is recorded and
/// the remaining groups still run.
fn run_branch(
    ctx: &CalibrationContext,
    master: &MasterCalibrationFrame,
    reporter: &Arc<dyn ProgressReporter>,
    stage: NightStage,
    groups: &[&FrameGroup],
) -> BranchReport {
    let mut report = BranchReport::new(stage);
    let total: usize = groups.iter().map(|g| g.len()).sum();
    reporter.begin_stage(stage, Some(total));

    let mut done = 0;
    for group in groups {
        report.groups += 1;
        match process(ctx, group, group.image_type(), master) {
            Ok(processed) => report.processed.extend(processed),
            Err(e) => {
                error!(group = %group.label(), error = %e, "Calibration failed");
                report.failures.push(GroupFailure {
                    group: group.label(),
                    error: e,
                });
            }
        }
        done += group.len();
        reporter.advance(stage, done);
    }

    reporter.finish_stage(stage);
    report
}
