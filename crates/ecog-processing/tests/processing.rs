use chrono::NaiveDateTime;
use ecog_core::events::seconds;
use ecog_core::{AnnotationDictionary, EdfLoader, EventAnnotations, EventSet, MemoryRecording, RecordingSource};
use ecog_processing::predictions::PredictionFile;
use ecog_processing::{
    read_dataset, ExtractionConfig, FeatureDataset, PredictionFileEventSource, RecordingOutcome,
    RecordingProcessor, SkipReason, TimeOrigin, WindowLabel,
};
use ecog_simulation::{
    write_edf, ChannelSpec, EcogSimulator, FaultKind, MemoryLoader, SignalPattern, SimulationConfig,
    StaticEventSource,
};
use std::path::{Path, PathBuf};

fn simulate(grid_channels: usize, secs: f64) -> MemoryRecording {
    let config = SimulationConfig::clinical_montage(grid_channels, secs).with_seed(5);
    EcogSimulator::new(config).unwrap().generate().unwrap()
}

fn config(output_dir: &Path) -> ExtractionConfig {
    ExtractionConfig {
        output_dir: output_dir.to_path_buf(),
        ..ExtractionConfig::ecog_default()
    }
}

fn annotations(start: NaiveDateTime, event_offsets: &[f64]) -> EventAnnotations {
    EventAnnotations {
        events: EventSet::from_offsets(start, event_offsets),
        prediction_times: vec![start + seconds(1.0)],
        correctness: vec![1.0],
    }
}

fn memory_processor(
    output_dir: &Path,
    loader: MemoryLoader,
    events: StaticEventSource,
) -> RecordingProcessor {
    RecordingProcessor::new(
        config(output_dir),
        Box::new(loader),
        Box::new(events),
        AnnotationDictionary::default(),
    )
    .unwrap()
}

#[test]
fn test_edf_recording_with_prediction_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    std::fs::create_dir_all(&input).unwrap();
    let recording_path = input.join("a1b2c3_3.edf");
    write_edf(&recording_path, &simulate(2, 100.0)).unwrap();

    let sessions: PredictionFile = serde_json::from_value(serde_json::json!({
        "a1b2c3_3": {
            "events": [45.0],
            "predictions": [{"elapsed": 2.0, "correct": 1.0}, {"elapsed": 7.0, "correct": 0.0}]
        }
    }))
    .unwrap();
    let dictionary = AnnotationDictionary::from_json(r#"{"a1b2c3_3": {"good": true}}"#).unwrap();

    let processor = RecordingProcessor::new(
        config(&dir.path().join("out")),
        Box::new(EdfLoader),
        Box::new(PredictionFileEventSource::new(sessions, "classifier.pkl")),
        dictionary,
    )
    .unwrap();

    let report = processor.process(&recording_path);
    let expected_output = dir.path().join("out").join("a1b2c3_3.npz");
    assert_eq!(
        report.outcome,
        RecordingOutcome::Written {
            output: expected_output.clone(),
            event_rows: 1,
            non_event_rows: 9,
        }
    );
    assert_eq!(report.metrics.prediction_count, 2);
    assert_eq!(report.metrics.mean_correctness, Some(0.5));
    assert_eq!(report.metrics.windows.windows_processed, 10);

    let dataset = read_dataset(&expected_output).unwrap();
    assert_eq!(dataset.freqs.len(), 129);
    assert_eq!(dataset.freqs[0], 0.0);
    assert!((dataset.freqs[128] - 500.0).abs() < 1e-9);

    let non_event = dataset.non_event.as_ref().unwrap();
    let event = dataset.event.as_ref().unwrap();
    assert_eq!((non_event.rows(), non_event.cols()), (9, 2 * 129));
    assert_eq!((event.rows(), event.cols()), (1, 2 * 129));
    assert!(non_event.as_slice().iter().all(|p| p.is_finite() && *p >= 0.0));
    assert!(!dir.path().join("out").join("a1b2c3_3.npz.partial").exists());
}

#[test]
fn test_three_events_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let recording = simulate(3, 100.0);
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/p7_s2.edf", recording);
    let mut events = StaticEventSource::new();
    events.insert("p7_s2", annotations(start, &[5.0, 25.5, 95.0]));

    let processor = memory_processor(dir.path(), loader, events);
    let report = processor.process(Path::new("/data/p7_s2.edf"));

    let RecordingOutcome::Written { output, event_rows, non_event_rows } = report.outcome else {
        panic!("unexpected outcome {:?}", report.outcome);
    };
    assert_eq!((event_rows, non_event_rows), (3, 7));

    let dataset = read_dataset(output).unwrap();
    assert_eq!(dataset.rows(ecog_processing::WindowLabel::Event), 3);
    assert_eq!(dataset.rows(ecog_processing::WindowLabel::NonEvent), 7);
    assert_eq!(dataset.event.as_ref().map(|m| m.cols()), Some(3 * 129));
}

/// Process a 30 s recording whose only prediction is 5 s after the start
fn process_with_origin(origin: TimeOrigin, event_offsets: &[f64]) -> (usize, usize, FeatureDataset) {
    let dir = tempfile::tempdir().unwrap();
    let recording = simulate(1, 30.0);
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/q1_s1.edf", recording);
    let mut events = StaticEventSource::new();
    events.insert(
        "q1_s1",
        EventAnnotations {
            events: EventSet::from_offsets(start, event_offsets),
            prediction_times: vec![start + seconds(5.0)],
            correctness: vec![1.0],
        },
    );

    let processor = RecordingProcessor::new(
        ExtractionConfig {
            time_origin: origin,
            ..config(dir.path())
        },
        Box::new(loader),
        Box::new(events),
        AnnotationDictionary::default(),
    )
    .unwrap();

    let report = processor.process(Path::new("/data/q1_s1.edf"));
    let RecordingOutcome::Written { output, event_rows, non_event_rows } = report.outcome else {
        panic!("unexpected outcome {:?}", report.outcome);
    };
    (event_rows, non_event_rows, read_dataset(output).unwrap())
}

#[test]
fn test_time_origin_moves_event_between_windows() {
    // Windows cover the same samples; only their clock times move by 5 s
    let (events, non_events, from_start) = process_with_origin(TimeOrigin::RecordingStart, &[12.0]);
    assert_eq!((events, non_events), (1, 2));
    let (events, non_events, from_prediction) =
        process_with_origin(TimeOrigin::EarliestPrediction, &[12.0]);
    assert_eq!((events, non_events), (1, 2));

    // 12 s lies in window 1 (10-20 s) from the start, in window 0 (5-15 s) from the prediction
    let event_row = |d: &FeatureDataset| d.get(WindowLabel::Event).unwrap().row(0).unwrap().to_vec();
    let non_event_row = |d: &FeatureDataset, i: usize| {
        d.get(WindowLabel::NonEvent).unwrap().row(i).unwrap().to_vec()
    };
    assert_eq!(event_row(&from_start), non_event_row(&from_prediction, 0));
    assert_eq!(event_row(&from_prediction), non_event_row(&from_start, 0));
    assert_eq!(non_event_row(&from_start, 1), non_event_row(&from_prediction, 1));
}

#[test]
fn test_time_origin_changes_class_counts() {
    // 12 s and 19 s share window 1 from the start but straddle 15 s from the prediction
    let (events, non_events, _) = process_with_origin(TimeOrigin::RecordingStart, &[12.0, 19.0]);
    assert_eq!((events, non_events), (1, 2));
    let (events, non_events, _) = process_with_origin(TimeOrigin::EarliestPrediction, &[12.0, 19.0]);
    assert_eq!((events, non_events), (2, 1));
}

#[test]
fn test_event_free_recording_writes_only_non_events() {
    let dir = tempfile::tempdir().unwrap();
    let recording = simulate(1, 30.0);
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/quiet.edf", recording);
    let mut events = StaticEventSource::new();
    events.insert("quiet", annotations(start, &[]));

    let report = memory_processor(dir.path(), loader, events).process(Path::new("/data/quiet.edf"));
    let RecordingOutcome::Written { output, event_rows, .. } = report.outcome else {
        panic!("unexpected outcome {:?}", report.outcome);
    };
    assert_eq!(event_rows, 0);

    let dataset = read_dataset(output).unwrap();
    assert!(dataset.event.is_none());
    assert_eq!(dataset.keys(), vec!["0", "freqs"]);
}

#[test]
fn test_read_failures_skip_single_windows() {
    let dir = tempfile::tempdir().unwrap();
    let recording = simulate(2, 100.0);
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/noisy.edf", recording);
    loader.insert_fault("/data/noisy.edf", 15_000..15_001, FaultKind::Malformed);
    loader.insert_fault("/data/noisy.edf", 72_500..73_000, FaultKind::Malformed);
    let mut events = StaticEventSource::new();
    events.insert("noisy", annotations(start, &[45.0]));

    let report = memory_processor(dir.path(), loader, events).process(Path::new("/data/noisy.edf"));
    assert!(report.outcome.is_written());
    assert_eq!(report.metrics.windows.windows_total, 10);
    assert_eq!(report.metrics.windows.windows_skipped, 2);
    assert_eq!(report.metrics.windows.windows_processed, 8);
    assert_eq!(report.metrics.windows.event_rows, 1);
    assert_eq!(report.metrics.windows.non_event_rows, 7);
}

#[test]
fn test_io_failure_fails_recording() {
    let dir = tempfile::tempdir().unwrap();
    let recording = simulate(2, 40.0);
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/broken.edf", recording);
    loader.insert_fault("/data/broken.edf", 20_000..20_001, FaultKind::Io);
    let mut events = StaticEventSource::new();
    events.insert("broken", annotations(start, &[]));

    let report = memory_processor(dir.path(), loader, events).process(Path::new("/data/broken.edf"));
    assert!(report.outcome.is_failed());
    assert!(!dir.path().join("broken.npz").exists());
}

#[test]
fn test_recording_without_signal_channels_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig {
        duration_secs: 20.0,
        ..SimulationConfig::default()
    }
    .with_channels(vec![ChannelSpec::new(
        "ECG",
        SignalPattern::Cardiac {
            heart_rate_bpm: 60.0,
            amplitude: 500.0,
        },
    )])
    .with_seed(1);
    let recording = EcogSimulator::new(config).unwrap().generate().unwrap();
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/ecg_only.edf", recording);
    let mut events = StaticEventSource::new();
    events.insert("ecg_only", annotations(start, &[3.0]));

    let report = memory_processor(dir.path(), loader, events).process(Path::new("/data/ecg_only.edf"));
    assert_eq!(report.outcome, RecordingOutcome::Skipped(SkipReason::NoSignalChannels));
}

#[test]
fn test_recording_without_times_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = MemoryLoader::new();
    loader.insert("/data/unlisted.edf", simulate(1, 20.0));

    let report = memory_processor(dir.path(), loader, StaticEventSource::new())
        .process(Path::new("/data/unlisted.edf"));
    assert_eq!(report.outcome, RecordingOutcome::Skipped(SkipReason::NoEventTimes));
    assert_eq!(report.metrics.windows.windows_total, 0);
}

#[test]
fn test_unreadable_recording_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let missing: PathBuf = dir.path().join("missing.edf");

    let processor = RecordingProcessor::new(
        config(dir.path()),
        Box::new(EdfLoader),
        Box::new(StaticEventSource::new()),
        AnnotationDictionary::default(),
    )
    .unwrap();

    let report = processor.process(&missing);
    assert!(matches!(report.outcome, RecordingOutcome::Skipped(SkipReason::Unreadable(_))));
}

#[test]
fn test_short_recording_has_no_usable_windows() {
    let dir = tempfile::tempdir().unwrap();
    let recording = simulate(1, 6.0);
    let start = recording.start_time();

    let mut loader = MemoryLoader::new();
    loader.insert("/data/short.edf", recording);
    let mut events = StaticEventSource::new();
    events.insert("short", annotations(start, &[2.0]));

    let report = memory_processor(dir.path(), loader, events).process(Path::new("/data/short.edf"));
    assert_eq!(report.outcome, RecordingOutcome::Skipped(SkipReason::NoUsableWindows));
}
