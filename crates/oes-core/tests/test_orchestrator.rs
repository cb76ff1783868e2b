mod common;

use std::sync::{Arc, Mutex};

use common::{build_standard_night, file_names, uniform, write_exposure, write_exposure_sized};
use oes_core::engine::NativeEngine;
use oes_core::error::PipelineError;
use oes_core::frame::{ImageType, ProcessingStage};
use oes_core::io::fits::read_image;
use oes_core::pipeline::config::PipelineConfig;
use oes_core::pipeline::{
    classify_night, run_night, run_night_reported, NightStage, ProgressReporter,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Begin(NightStage),
    Finish(NightStage),
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: NightStage, _total: Option<usize>) {
        self.events.lock().unwrap().push(Event::Begin(stage));
    }

    fn finish_stage(&self, stage: NightStage) {
        self.events.lock().unwrap().push(Event::Finish(stage));
    }
}

fn expected_outputs() -> Vec<String> {
    let mut names = vec!["mzero.fit".to_string()];
    names.extend((0..2).map(|i| format!("fz_flat{i:03}.fit")));
    names.extend((0..5).map(|i| format!("oz_obj{i:03}.fit")));
    names.extend((0..5).map(|i| format!("ozc_obj{i:03}.fit")));
    names.sort();
    names
}

#[test]
fn test_standard_night() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    let output = dir.path().join("out");
    let config = PipelineConfig::new(&night, &output);

    let report = run_night(&config, Arc::new(NativeEngine::new())).unwrap();
    assert!(report.is_success());
    assert_eq!(report.night_id, "20240314");
    assert_eq!(report.master.source_count(), 3);
    assert!(report.rejected.is_empty());

    assert_eq!(file_names(&output), expected_outputs());
    assert!(!file_names(&output).iter().any(|n| n.starts_with("fzc_")));

    let flats = report.branch(NightStage::ProcessFlats).unwrap();
    assert_eq!(flats.count(ProcessingStage::BiasSubtracted), 2);
    assert_eq!(flats.count(ProcessingStage::CosmicRayCleaned), 0);
    let objects = report.branch(NightStage::ProcessObjects).unwrap();
    assert_eq!(objects.count(ProcessingStage::CosmicRayCleaned), 5);
    let comps = report.branch(NightStage::ProcessComps).unwrap();
    assert_eq!(comps.groups, 0);
    assert!(comps.processed.is_empty());

    let master = read_image(&output.join("mzero.fit")).unwrap();
    assert!(master.data.iter().all(|&v| v == 101.0));

    let flat = read_image(&output.join("fz_flat000.fit")).unwrap();
    assert!(flat.data.iter().all(|&v| v == 899.0));

    let subtracted = read_image(&output.join("oz_obj000.fit")).unwrap();
    assert_eq!(subtracted.data[[8, 8]], 4899.0);
    assert_eq!(subtracted.data[[0, 0]], 499.0);

    let cleaned = read_image(&output.join("ozc_obj000.fit")).unwrap();
    assert!(cleaned.data.iter().all(|&v| v == 499.0));
    assert_eq!(cleaned.header.get_string("OBJECT"), Some("HD 12345"));
}

#[test]
fn test_sequential_matches_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");

    let parallel_out = dir.path().join("parallel");
    run_night(
        &PipelineConfig::new(&night, &parallel_out),
        Arc::new(NativeEngine::new()),
    )
    .unwrap();

    let sequential_out = dir.path().join("sequential");
    let mut config = PipelineConfig::new(&night, &sequential_out);
    config.parallel_branches = false;
    run_night(&config, Arc::new(NativeEngine::new())).unwrap();

    let names = file_names(&parallel_out);
    assert_eq!(names, file_names(&sequential_out));
    for name in names {
        let a = std::fs::read(parallel_out.join(&name)).unwrap();
        let b = std::fs::read(sequential_out.join(&name)).unwrap();
        assert_eq!(a, b, "{name} differs");
    }
}

#[test]
fn test_missing_zero_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let night = dir.path().join("20240315");
    write_exposure(&night.join("flat001.fits"), "flat", None, &uniform(1000));
    write_exposure(&night.join("obj001.fits"), "object", Some("M42"), &uniform(600));
    let output = dir.path().join("out");

    let result = run_night(&PipelineConfig::new(&night, &output), Arc::new(NativeEngine::new()));
    match result {
        Err(PipelineError::MissingCalibrationData { night_id }) => assert_eq!(night_id, "20240315"),
        other => panic!("expected MissingCalibrationData, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_output_not_empty() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("previous.log"), "earlier run").unwrap();

    let result = run_night(&PipelineConfig::new(&night, &output), Arc::new(NativeEngine::new()));
    assert!(matches!(result, Err(PipelineError::OutputNotEmpty { .. })));
    assert_eq!(file_names(&output), ["previous.log"]);
}

#[test]
fn test_empty_existing_output_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();

    let report = run_night(&PipelineConfig::new(&night, &output), Arc::new(NativeEngine::new())).unwrap();
    assert!(report.is_success());
}

#[test]
fn test_master_finishes_before_branches() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    write_exposure(&night.join("arc001.fits"), "comp", Some("ThAr"), &uniform(300));
    let output = dir.path().join("out");
    let reporter = Arc::new(RecordingReporter::default());

    run_night_reported(
        &PipelineConfig::new(&night, &output),
        Arc::new(NativeEngine::new()),
        reporter.clone(),
    )
    .unwrap();

    let events = reporter.events.lock().unwrap().clone();
    let position = |event: Event| events.iter().position(|e| *e == event).unwrap();

    let classified = position(Event::Finish(NightStage::Classify));
    let master_begin = position(Event::Begin(NightStage::BuildMaster));
    let master_done = position(Event::Finish(NightStage::BuildMaster));
    assert!(classified < master_begin);
    for stage in [
        NightStage::ProcessFlats,
        NightStage::ProcessComps,
        NightStage::ProcessObjects,
    ] {
        assert!(master_done < position(Event::Begin(stage)), "{stage} started early");
        assert!(position(Event::Begin(stage)) < position(Event::Finish(stage)));
    }
}

#[test]
fn test_failed_group_does_not_stop_other_branches() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    // A comp with the wrong geometry cannot be bias-subtracted.
    write_exposure_sized(&night.join("arc001.fits"), 8, 8, "comp", Some("ThAr"), &[300; 64]);
    let output = dir.path().join("out");

    let report = run_night(&PipelineConfig::new(&night, &output), Arc::new(NativeEngine::new())).unwrap();
    assert!(!report.is_success());

    let comps = report.branch(NightStage::ProcessComps).unwrap();
    assert_eq!(comps.failures.len(), 1);
    assert_eq!(comps.failures[0].group, "comp");
    assert!(matches!(
        comps.failures[0].error,
        PipelineError::ReductionEngineFailure {
            operation: "subtract",
            ..
        }
    ));

    let objects = report.branch(NightStage::ProcessObjects).unwrap();
    assert!(objects.is_success());
    assert_eq!(objects.processed.len(), 10);
    assert!(output.join("ozc_obj004.fit").exists());
}

#[test]
fn test_rejected_and_skipped_frames_reported() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    write_exposure(&night.join("bias001.fits"), "bias", None, &uniform(100));
    write_exposure(&night.join("dark001.fits"), "dark", None, &uniform(110));
    write_exposure(&night.join("dome001.fits"), "object", Some("domeflat"), &uniform(900));
    std::fs::write(night.join("notes.txt"), "clear skies").unwrap();
    let output = dir.path().join("out");

    let report = run_night(&PipelineConfig::new(&night, &output), Arc::new(NativeEngine::new())).unwrap();
    assert!(report.is_success());

    assert_eq!(report.rejected.len(), 1);
    assert!(report.rejected[0].path.ends_with("bias001.fits"));
    assert!(matches!(
        report.rejected[0].error,
        PipelineError::UnrecognizedFrameType { .. }
    ));

    let mut skipped: Vec<ImageType> = report.skipped.iter().map(|f| f.image_type()).collect();
    skipped.sort();
    assert_eq!(skipped, [ImageType::Dark, ImageType::DomeFlat]);

    // Neither the dark nor the dome flat produced output.
    assert_eq!(file_names(&output), expected_outputs());
}

#[test]
fn test_output_extension() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    let output = dir.path().join("out");
    let mut config = PipelineConfig::new(&night, &output);
    config.extension = "fits".into();

    run_night(&config, Arc::new(NativeEngine::new())).unwrap();
    let names = file_names(&output);
    assert!(names.contains(&"mzero.fits".to_string()));
    assert!(names.contains(&"ozc_obj004.fits".to_string()));
}

#[test]
fn test_engine_timeout_configured() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    let output = dir.path().join("out");
    let mut config = PipelineConfig::new(&night, &output);
    config.engine.timeout_secs = Some(60);
    config.engine.scratch_dir = Some(dir.path().to_path_buf());

    let report = run_night(&config, Arc::new(NativeEngine::new())).unwrap();
    assert!(report.is_success());

    // Every scratch list was released.
    let leftovers: Vec<String> = file_names(dir.path())
        .into_iter()
        .filter(|n| n.ends_with(".lst"))
        .collect();
    assert!(leftovers.is_empty(), "leftover lists: {leftovers:?}");
}

#[test]
fn test_classify_night_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let night = build_standard_night(dir.path(), "20240314");
    let config = PipelineConfig::new(&night, dir.path().join("never"));
    let reporter: Arc<dyn ProgressReporter> = Arc::new(RecordingReporter::default());

    let (frames, rejected) = classify_night(&config, &reporter).unwrap();
    assert_eq!(frames.zero.len(), 3);
    assert_eq!(frames.objects.len(), 1);
    assert_eq!(frames.objects[0].object_name(), Some("HD_12345"));
    assert!(rejected.is_empty());
    assert!(!dir.path().join("never").exists());
}

#[test]
fn test_input_must_be_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(dir.path().join("missing"), dir.path().join("out"));
    assert!(matches!(
        run_night(&config, Arc::new(NativeEngine::new())),
        Err(PipelineError::Config(_))
    ));
}
