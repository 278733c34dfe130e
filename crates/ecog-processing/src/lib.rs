//! ECoG-Processing: Windowed spectral feature extraction
//!
//! Window splitting, event labeling, Welch PSD, per-class accumulation and
//! per-recording dataset output.

pub mod config;
pub mod windows;
pub mod labeler;
pub mod psd;
pub mod accumulator;
pub mod dataset;
pub mod extractor;
pub mod predictions;
pub mod processor;

pub use config::{Detrend, ExtractionConfig, TimeOrigin, WelchConfig, WindowFunction};
pub use windows::{window_len_samples, Window, WindowSplitter};
pub use labeler::{is_event, label_window, WindowLabel};
pub use psd::{Psd, WelchEstimator};
pub use accumulator::{ClassAccumulator, ClassAccumulators, FrequencyAxis};
pub use dataset::{read_dataset, DatasetWriter, FeatureDataset, FeatureMatrix, NpzDatasetWriter};
pub use extractor::{ExtractionStats, WindowFeatureExtractor, WindowOutcome};
pub use predictions::{PredictionFileEventSource, SessionPredictions};
pub use processor::{
    RecordingMetrics, RecordingOutcome, RecordingProcessor, RecordingReport, SkipReason,
};
