//! Recording processor: one recording in, one dataset (or a reason for none) out

use crate::config::{ExtractionConfig, TimeOrigin};
use crate::dataset::{DatasetWriter, NpzDatasetWriter};
use crate::extractor::{ExtractionStats, WindowFeatureExtractor};
use crate::windows::{window_len_samples, WindowSplitter};
use ecog_core::events::session_id;
use ecog_core::{
    AnnotationDictionary, ChannelKind, EcogError, EcogResult, EventSource, RecordingLoader,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a recording produced no dataset without failing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The recording could not be opened
    Unreadable(String),
    /// No channel classified as signal of interest
    NoSignalChannels,
    /// The event source reported no prediction times
    NoEventTimes,
    /// Every window was skipped
    NoUsableWindows,
}

/// Final state of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordingOutcome {
    Written {
        output: PathBuf,
        event_rows: usize,
        non_event_rows: usize,
    },
    Skipped(SkipReason),
    Failed(String),
}

impl RecordingOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, RecordingOutcome::Written { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecordingOutcome::Failed(_))
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(reason) => write!(f, "unreadable: {}", reason),
            SkipReason::NoSignalChannels => write!(f, "no signal channels"),
            SkipReason::NoEventTimes => write!(f, "no event times"),
            SkipReason::NoUsableWindows => write!(f, "no usable windows"),
        }
    }
}

/// Performance metrics of one recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetrics {
    /// Processing time in microseconds
    pub processing_time_us: u64,
    pub windows: ExtractionStats,
    pub prediction_count: usize,
    pub mean_correctness: Option<f64>,
}

impl RecordingMetrics {
    /// Start timing a recording
    pub fn start_timing() -> RecordingTimer {
        RecordingTimer {
            start_time: Instant::now(),
            metrics: RecordingMetrics::default(),
        }
    }
}

/// Helper for timing a recording
pub struct RecordingTimer {
    start_time: Instant,
    metrics: RecordingMetrics,
}

impl RecordingTimer {
    /// Finish timing and return metrics
    pub fn finish(mut self) -> RecordingMetrics {
        self.metrics.processing_time_us = self.start_time.elapsed().as_micros() as u64;
        self.metrics
    }

    pub fn set_window_stats(&mut self, stats: ExtractionStats) {
        self.metrics.windows = stats;
    }

    pub fn set_predictions(&mut self, count: usize, mean_correctness: Option<f64>) {
        self.metrics.prediction_count = count;
        self.metrics.mean_correctness = mean_correctness;
    }
}

/// Outcome and metrics of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingReport {
    pub path: PathBuf,
    pub outcome: RecordingOutcome,
    pub metrics: RecordingMetrics,
}

/// Turns one recording into one dataset.
///
/// Holds only read-only state, so one instance can serve many workers.
pub struct RecordingProcessor {
    config: ExtractionConfig,
    loader: Box<dyn RecordingLoader>,
    events: Box<dyn EventSource>,
    dictionary: AnnotationDictionary,
    writer: Box<dyn DatasetWriter>,
}

impl RecordingProcessor {
    /// Create a processor writing `.npz` datasets into the configured output directory
    pub fn new(
        config: ExtractionConfig,
        loader: Box<dyn RecordingLoader>,
        events: Box<dyn EventSource>,
        dictionary: AnnotationDictionary,
    ) -> EcogResult<Self> {
        config.validate()?;
        let writer = Box::new(NpzDatasetWriter::from_config(&config));
        Ok(Self {
            config,
            loader,
            events,
            dictionary,
            writer,
        })
    }

    /// Replace the dataset writer
    pub fn with_writer(mut self, writer: Box<dyn DatasetWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &AnnotationDictionary {
        &self.dictionary
    }

    /// Process one recording; every error is folded into the report
    pub fn process(&self, path: &Path) -> RecordingReport {
        let mut timer = RecordingMetrics::start_timing();

        let outcome = match self.run(path, &mut timer) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                RecordingOutcome::Failed(e.to_string())
            }
        };

        RecordingReport {
            path: path.to_path_buf(),
            outcome,
            metrics: timer.finish(),
        }
    }

    fn run(&self, path: &Path, timer: &mut RecordingTimer) -> EcogResult<RecordingOutcome> {
        let mut recording = match self.loader.open(path) {
            Ok(recording) => recording,
            Err(e) => {
                warn!("Skipping unreadable recording {}: {}", path.display(), e);
                return Ok(RecordingOutcome::Skipped(SkipReason::Unreadable(e.to_string())));
            }
        };

        let rate = recording.sampling_rate();
        if let Some(expected) = self.config.expected_sampling_rate {
            if (rate - expected).abs() > 1e-6 {
                warn!("{} sampled at {}Hz, expected {}Hz", path.display(), rate, expected);
            }
        }

        let picks = self
            .config
            .channel_rules
            .picks(recording.channel_names(), ChannelKind::SignalOfInterest);
        if picks.is_empty() {
            debug!("No signal channels in {}", path.display());
            return Ok(RecordingOutcome::Skipped(SkipReason::NoSignalChannels));
        }

        let annotations = self
            .events
            .annotations(path, recording.start_time(), &self.dictionary)?;
        if !annotations.has_times() {
            info!("no times for {}", path.display());
            return Ok(RecordingOutcome::Skipped(SkipReason::NoEventTimes));
        }

        let mean_correctness = annotations.mean_correctness();
        timer.set_predictions(annotations.prediction_times.len(), mean_correctness);
        info!(
            "{}: {} channels, {} events, {} predictions, mean correctness {:.3}",
            path.display(),
            picks.len(),
            annotations.events.len(),
            annotations.prediction_times.len(),
            mean_correctness.unwrap_or(f64::NAN)
        );

        let origin = match self.config.time_origin {
            TimeOrigin::RecordingStart => recording.start_time(),
            TimeOrigin::EarliestPrediction => annotations
                .earliest_prediction()
                .unwrap_or_else(|| recording.start_time()),
        };

        let window_len = window_len_samples(rate, self.config.window_seconds)?;
        let windows = WindowSplitter::new(recording.sample_count(), window_len)?.timed(origin, rate);

        let mut extractor = WindowFeatureExtractor::new(
            recording.as_mut(),
            picks,
            &annotations.events,
            &self.config.welch,
        )?;
        let result = extractor.run(windows);
        let stats = extractor.stats();
        timer.set_window_stats(stats);
        result?;

        let Some(dataset) = extractor.finish() else {
            warn!("No usable windows in {} ({} skipped)", path.display(), stats.windows_skipped);
            return Ok(RecordingOutcome::Skipped(SkipReason::NoUsableWindows));
        };

        let name = session_id(path).ok_or_else(|| EcogError::InvalidConfig {
            reason: format!("cannot derive output name from {}", path.display()),
        })?;
        let output = self.writer.write(&name, &dataset)?;

        info!(
            "Wrote {} ({} event rows, {} non-event rows, {} windows skipped)",
            output.display(),
            stats.event_rows,
            stats.non_event_rows,
            stats.windows_skipped
        );

        Ok(RecordingOutcome::Written {
            output,
            event_rows: stats.event_rows,
            non_event_rows: stats.non_event_rows,
        })
    }
}
