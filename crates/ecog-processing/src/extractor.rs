//! Per-window feature extraction
//!
//! Reads each window of the picked channels, estimates its PSD, checks the
//! frequency axis and routes the flattened row to the accumulator of the
//! window's class. Value-validity errors skip the window; any other error
//! aborts the recording.

use crate::accumulator::{ClassAccumulators, FrequencyAxis};
use crate::config::WelchConfig;
use crate::dataset::FeatureDataset;
use crate::labeler::{label_window, WindowLabel};
use crate::psd::WelchEstimator;
use crate::windows::Window;
use ecog_core::{EcogError, EcogResult, EventSet, RecordingSource};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Window counters of one recording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub windows_total: usize,
    pub windows_processed: usize,
    pub windows_skipped: usize,
    pub event_rows: usize,
    pub non_event_rows: usize,
}

/// Result of a single window
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Accumulated(WindowLabel),
    Skipped(EcogError),
}

pub struct WindowFeatureExtractor<'a> {
    recording: &'a mut dyn RecordingSource,
    events: &'a EventSet,
    picks: Vec<usize>,
    sampling_rate: f64,
    estimator: WelchEstimator,
    axis: FrequencyAxis,
    accumulators: ClassAccumulators,
    stats: ExtractionStats,
}

impl<'a> WindowFeatureExtractor<'a> {
    pub fn new(
        recording: &'a mut dyn RecordingSource,
        picks: Vec<usize>,
        events: &'a EventSet,
        welch: &WelchConfig,
    ) -> EcogResult<Self> {
        let sampling_rate = recording.sampling_rate();
        Ok(Self {
            recording,
            events,
            picks,
            sampling_rate,
            estimator: WelchEstimator::new(welch.clone())?,
            axis: FrequencyAxis::new(),
            accumulators: ClassAccumulators::new(),
            stats: ExtractionStats::default(),
        })
    }

    fn accumulate(&mut self, window: &Window) -> EcogResult<WindowLabel> {
        let start = self.recording.native_index(window.start_sample);
        let end = self.recording.native_index(window.end_sample);

        let data = self.recording.read(&self.picks, start, end)?;
        let psd = self.estimator.estimate(&data, self.sampling_rate)?;
        self.axis.check_or_set(&psd.freqs)?;

        let label = label_window(window, self.events);
        self.accumulators.append(label, &psd.flatten())?;
        Ok(label)
    }

    /// Process one window
    pub fn process_window(&mut self, window: &Window) -> EcogResult<WindowOutcome> {
        self.stats.windows_total += 1;

        match self.accumulate(window) {
            Ok(label) => {
                self.stats.windows_processed += 1;
                match label {
                    WindowLabel::Event => self.stats.event_rows += 1,
                    WindowLabel::NonEvent => self.stats.non_event_rows += 1,
                }
                Ok(WindowOutcome::Accumulated(label))
            }
            Err(e) if e.is_value_error() => {
                self.stats.windows_skipped += 1;
                debug!("Skipping window {} ({}..{}): {}", window.index, window.start_sample, window.end_sample, e);
                Ok(WindowOutcome::Skipped(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Process windows in order, stopping at the first error that is not window-local
    pub fn run<I>(&mut self, windows: I) -> EcogResult<()>
    where
        I: IntoIterator<Item = Window>,
    {
        for window in windows {
            self.process_window(&window)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> ExtractionStats {
        self.stats
    }

    pub fn frequency_axis(&self) -> Option<&[f64]> {
        self.axis.get()
    }

    /// Collect the accumulated rows; `None` when nothing usable was produced
    pub fn finish(self) -> Option<FeatureDataset> {
        if self.accumulators.is_empty() {
            return None;
        }
        let freqs = self.axis.into_inner()?;
        let ClassAccumulators { non_event, event } = self.accumulators;

        Some(FeatureDataset {
            freqs,
            non_event: non_event.into_matrix(),
            event: event.into_matrix(),
        })
    }
}
