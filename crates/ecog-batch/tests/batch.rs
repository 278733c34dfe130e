use ecog_batch::{BatchConfig, BatchOrchestrator};
use ecog_core::events::seconds;
use ecog_core::{
    AnnotationDictionary, EcogResult, EdfLoader, EventAnnotations, EventSet, MemoryRecording,
    RecordingLoader, RecordingSource,
};
use ecog_processing::predictions::PredictionFile;
use ecog_processing::{
    read_dataset, ExtractionConfig, PredictionFileEventSource, RecordingOutcome, RecordingProcessor,
    SkipReason,
};
use ecog_simulation::{
    write_edf, ChannelSpec, EcogSimulator, MemoryLoader, SignalPattern, SimulationConfig,
    StaticEventSource,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn simulate(grid_channels: usize, secs: f64) -> MemoryRecording {
    let config = SimulationConfig::clinical_montage(grid_channels, secs).with_seed(9);
    EcogSimulator::new(config).unwrap().generate().unwrap()
}

fn ecg_only(secs: f64) -> MemoryRecording {
    let config = SimulationConfig {
        duration_secs: secs,
        ..SimulationConfig::default()
    }
    .with_channels(vec![ChannelSpec::new(
        "ECG",
        SignalPattern::Cardiac {
            heart_rate_bpm: 66.0,
            amplitude: 700.0,
        },
    )])
    .with_seed(2);
    EcogSimulator::new(config).unwrap().generate().unwrap()
}

fn extraction(output_dir: &Path) -> ExtractionConfig {
    ExtractionConfig {
        output_dir: output_dir.to_path_buf(),
        ..ExtractionConfig::ecog_default()
    }
}

#[tokio::test]
async fn test_batch_over_edf_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("edf");
    let output = dir.path().join("features");
    std::fs::create_dir_all(root.join("pt01")).unwrap();
    std::fs::create_dir_all(root.join("pt02")).unwrap();

    write_edf(root.join("pt01/a1b2_1.edf"), &simulate(2, 40.0)).unwrap();
    write_edf(root.join("pt01/a1b2_2.edf"), &ecg_only(40.0)).unwrap();
    write_edf(root.join("pt02/zz99_1.edf"), &simulate(1, 20.0)).unwrap();

    let dictionary =
        AnnotationDictionary::from_json(r#"{"pt01_a1b2_1": {}, "pt01_a1b2_2": {}}"#).unwrap();
    let sessions: PredictionFile = serde_json::from_value(serde_json::json!({
        "a1b2_1": {"events": [15.0], "predictions": [{"elapsed": 3.0, "correct": 1.0}]},
        "a1b2_2": {"events": [5.0], "predictions": [{"elapsed": 3.0, "correct": 0.0}]}
    }))
    .unwrap();

    let processor = RecordingProcessor::new(
        extraction(&output),
        Box::new(EdfLoader),
        Box::new(PredictionFileEventSource::new(sessions, "clf.pkl")),
        dictionary,
    )
    .unwrap();
    let summary = BatchOrchestrator::new(processor, 2).unwrap().run(&root).await.unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.selected, 2);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        summary.report(&root.join("pt01/a1b2_2.edf")).map(|r| &r.outcome),
        Some(&RecordingOutcome::Skipped(SkipReason::NoSignalChannels))
    );

    let dataset = read_dataset(output.join("a1b2_1.npz")).unwrap();
    assert_eq!(dataset.rows(ecog_processing::WindowLabel::Event), 1);
    assert_eq!(dataset.rows(ecog_processing::WindowLabel::NonEvent), 3);
    assert!(!output.join("a1b2_2.npz").exists());
    assert!(!output.join("zz99_1.npz").exists());
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let processor = RecordingProcessor::new(
        extraction(dir.path()),
        Box::new(EdfLoader),
        Box::new(StaticEventSource::new()),
        AnnotationDictionary::default(),
    )
    .unwrap();

    let orchestrator = BatchOrchestrator::new(processor, 1).unwrap();
    assert!(orchestrator.run(&dir.path().join("absent")).await.is_err());
}

/// Loader that panics on one path and records peak concurrency
struct InstrumentedLoader {
    inner: MemoryLoader,
    poisoned: PathBuf,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl RecordingLoader for InstrumentedLoader {
    fn open(&self, path: &Path) -> EcogResult<Box<dyn RecordingSource>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if path == self.poisoned {
            panic!("decoder crashed on {}", path.display());
        }
        self.inner.open(path)
    }
}

#[tokio::test]
async fn test_panicking_worker_is_counted_and_parallelism_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let mut inner = MemoryLoader::new();
    let mut events = StaticEventSource::new();
    let paths: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("/mem/s_{}.edf", i))).collect();

    for (i, path) in paths.iter().enumerate() {
        let recording = simulate(1, 20.0);
        let start = recording.start_time();
        inner.insert(path.clone(), recording);
        events.insert(
            &format!("s_{}", i),
            EventAnnotations {
                events: EventSet::from_offsets(start, &[12.0]),
                prediction_times: vec![start + seconds(1.0)],
                correctness: vec![1.0],
            },
        );
    }

    let peak = Arc::new(AtomicUsize::new(0));
    let loader = InstrumentedLoader {
        inner,
        poisoned: paths[3].clone(),
        in_flight: Arc::new(AtomicUsize::new(0)),
        peak: Arc::clone(&peak),
    };

    let config = BatchConfig {
        extraction: extraction(dir.path()),
        workers: Some(2),
    };
    let processor = RecordingProcessor::new(
        config.extraction.clone(),
        Box::new(loader),
        Box::new(events),
        AnnotationDictionary::default(),
    )
    .unwrap();

    let summary = BatchOrchestrator::new(processor, config.worker_count())
        .unwrap()
        .process_files(paths.clone())
        .await;

    assert_eq!(summary.selected, 6);
    assert_eq!(summary.written, 5);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.reports.len(), 6);
    assert!(summary.report(&paths[3]).unwrap().outcome.is_failed());
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(dir.path().join("s_5.npz").exists());
    assert!(!dir.path().join("s_3.npz").exists());
}
