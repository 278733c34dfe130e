//! Bounded-parallel batch over many recordings
//!
//! Each recording runs on a blocking worker holding one semaphore permit.
//! Workers only share the processor through an `Arc` and report over a
//! channel to a single reporter task, which owns the progress bar and the
//! running tally.
//!
//! Workers are threads, not processes: a panic fails only its recording, but
//! a process abort (out of memory, stack overflow) ends the batch.

use crate::discovery::{discover_recordings, filter_known_sessions};
use ecog_core::{config_error, EcogError, EcogResult};
use ecog_processing::{
    ExtractionConfig, RecordingMetrics, RecordingOutcome, RecordingProcessor, RecordingReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Batch settings: per-recording extraction plus the worker count
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub extraction: ExtractionConfig,
    /// Parallel recordings; `None` uses every available core
    pub workers: Option<usize>,
}

impl BatchConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn validate(&self) -> EcogResult<()> {
        if self.workers == Some(0) {
            return Err(config_error!("Worker count must be at least 1"));
        }
        self.extraction.validate()
    }

    pub fn from_json(json: &str) -> EcogResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| config_error!("Failed to deserialize batch configuration: {}", e))
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EcogResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| EcogError::io(path, e))?;
        let config = Self::from_json(&json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Message from a worker to the reporter
#[derive(Debug)]
pub enum ProgressEvent {
    Started(PathBuf),
    Finished(RecordingReport),
    Panicked { path: PathBuf, message: String },
}

/// Result of a whole batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Recordings found under the root
    pub discovered: usize,
    /// Recordings whose session is in the annotation dictionary
    pub selected: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reports: Vec<RecordingReport>,
}

impl BatchSummary {
    /// Report of one recording
    pub fn report(&self, path: &Path) -> Option<&RecordingReport> {
        self.reports.iter().find(|report| report.path == path)
    }
}

/// Runs a [`RecordingProcessor`] over many recordings with bounded parallelism
pub struct BatchOrchestrator {
    processor: Arc<RecordingProcessor>,
    workers: usize,
    show_progress: bool,
}

impl BatchOrchestrator {
    pub fn new(processor: RecordingProcessor, workers: usize) -> EcogResult<Self> {
        if workers == 0 {
            return Err(config_error!("Worker count must be at least 1"));
        }
        Ok(Self {
            processor: Arc::new(processor),
            workers,
            show_progress: false,
        })
    }

    /// Draw a terminal progress bar while the batch runs
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Discover recordings under `root`, keep known sessions, process them all
    pub async fn run(&self, root: &Path) -> EcogResult<BatchSummary> {
        let extension = &self.processor.config().recording_extension;
        let discovered = discover_recordings(root, extension)?;
        let discovered_count = discovered.len();
        let selected = filter_known_sessions(discovered, self.processor.dictionary());
        info!(
            "{} of {} recordings under {} are in the annotation dictionary",
            selected.len(),
            discovered_count,
            root.display()
        );

        let mut summary = self.process_files(selected).await;
        summary.discovered = discovered_count;
        Ok(summary)
    }

    /// Process an explicit list of recordings
    pub async fn process_files(&self, files: Vec<PathBuf>) -> BatchSummary {
        let total = files.len();
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(report_progress(rx, total, self.show_progress));

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles: Vec<(PathBuf, JoinHandle<()>)> = Vec::with_capacity(total);

        for path in files {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let processor = Arc::clone(&self.processor);
            let worker_tx = tx.clone();
            let worker_path = path.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _ = worker_tx.send(ProgressEvent::Started(worker_path.clone()));
                let report = processor.process(&worker_path);
                let _ = worker_tx.send(ProgressEvent::Finished(report));
            });
            handles.push((path, handle));
        }

        for (path, handle) in handles {
            if let Err(e) = handle.await {
                let message = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                let _ = tx.send(ProgressEvent::Panicked { path, message });
            }
        }
        drop(tx);

        let mut summary = match reporter.await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Progress reporter stopped: {}", e);
                BatchSummary::default()
            }
        };
        summary.discovered = total;
        summary.selected = total;

        info!(
            "Batch finished: {} written, {} skipped, {} failed of {} recordings",
            summary.written, summary.skipped, summary.failed, summary.selected
        );
        summary
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn report_progress(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    total: usize,
    show: bool,
) -> BatchSummary {
    let bar = if show {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("  {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut summary = BatchSummary::default();
    while let Some(event) = rx.recv().await {
        let report = match event {
            ProgressEvent::Started(path) => {
                bar.set_message(file_name(&path));
                continue;
            }
            ProgressEvent::Finished(report) => report,
            ProgressEvent::Panicked { path, message } => {
                error!("Worker for {} panicked: {}", path.display(), message);
                RecordingReport {
                    path,
                    outcome: RecordingOutcome::Failed(format!("worker panicked: {}", message)),
                    metrics: RecordingMetrics::default(),
                }
            }
        };

        match &report.outcome {
            RecordingOutcome::Written { .. } => summary.written += 1,
            RecordingOutcome::Skipped(_) => summary.skipped += 1,
            RecordingOutcome::Failed(_) => summary.failed += 1,
        }
        summary.reports.push(report);
        bar.inc(1);
    }

    bar.finish_with_message("Complete");
    summary
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_partial_json() {
        let config =
            BatchConfig::from_json(r#"{"workers": 3, "extraction": {"window_seconds": 5.0}}"#).unwrap();
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.extraction.window_seconds, 5.0);
        assert_eq!(config.extraction.recording_extension, "edf");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = BatchConfig {
            workers: Some(0),
            ..BatchConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(BatchConfig::default().worker_count() >= 1);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic");
    }
}
