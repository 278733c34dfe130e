//! Error handling for the ECoG feature pipeline
//!
//! A single error type covers recording access, event extraction, spectral
//! estimation and dataset storage. Per-window failures are split from
//! per-recording failures through [`EcogError::is_value_error`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type alias for pipeline operations
pub type EcogResult<T> = Result<T, EcogError>;

/// Error type for all pipeline operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EcogError {
    /// Invalid configuration value
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Sampling rate that cannot be used for windowing or PSD estimation
    InvalidSamplingRate {
        /// Provided sampling rate
        rate: f64,
    },

    /// Sample range outside of the recording
    ReadRange {
        /// First requested sample
        start: usize,
        /// One past the last requested sample
        end: usize,
        /// Samples available in the recording
        available: usize,
    },

    /// Segment that was read but cannot be used (empty, non-finite, mixed rates)
    MalformedSegment {
        /// Description of the segment issue
        reason: String,
    },

    /// Channel index that does not exist in the recording
    ChannelOutOfRange {
        /// Requested channel index
        index: usize,
        /// Number of channels in the recording
        channel_count: usize,
    },

    /// Frequency axis of a window differs from the one established for the recording
    FrequencyAxisMismatch {
        /// Number of bins in the established axis
        expected: usize,
        /// Number of bins produced by this window
        actual: usize,
    },

    /// Feature row whose length differs from the rows already accumulated
    RowLengthMismatch {
        /// Established row length
        expected: usize,
        /// Length of the rejected row
        actual: usize,
    },

    /// Recording file header or layout could not be parsed
    Format {
        /// File being parsed
        path: PathBuf,
        /// Description of the format issue
        reason: String,
    },

    /// Annotation dictionary or prediction file problem
    Annotation {
        /// Description of the annotation issue
        reason: String,
    },

    /// Filesystem error
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// Output dataset could not be written or read back
    Storage {
        /// Description of the storage issue
        reason: String,
    },
}

impl EcogError {
    /// Wrap an I/O error together with the path that caused it
    pub fn io(path: impl AsRef<Path>, error: std::io::Error) -> Self {
        EcogError::Io {
            path: path.as_ref().to_path_buf(),
            message: error.to_string(),
        }
    }

    /// Build a format error for a recording file
    pub fn format(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        EcogError::Format {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Value-validity errors affect a single window only.
    ///
    /// The extractor skips the window and carries on with the recording when
    /// this returns `true`; every other error aborts the recording.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            EcogError::ReadRange { .. }
                | EcogError::MalformedSegment { .. }
                | EcogError::FrequencyAxisMismatch { .. }
                | EcogError::RowLengthMismatch { .. }
        )
    }
}

impl fmt::Display for EcogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcogError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            EcogError::InvalidSamplingRate { rate } => {
                write!(f, "Invalid sampling rate: {}Hz", rate)
            }
            EcogError::ReadRange { start, end, available } => {
                write!(f, "Read range {}..{} outside of recording with {} samples",
                       start, end, available)
            }
            EcogError::MalformedSegment { reason } => {
                write!(f, "Malformed segment: {}", reason)
            }
            EcogError::ChannelOutOfRange { index, channel_count } => {
                write!(f, "Channel index {} out of range, recording has {} channels",
                       index, channel_count)
            }
            EcogError::FrequencyAxisMismatch { expected, actual } => {
                write!(f, "Frequency axis mismatch: expected {} bins, got {}",
                       expected, actual)
            }
            EcogError::RowLengthMismatch { expected, actual } => {
                write!(f, "Feature row length mismatch: expected {}, got {}",
                       expected, actual)
            }
            EcogError::Format { path, reason } => {
                write!(f, "Format error in {}: {}", path.display(), reason)
            }
            EcogError::Annotation { reason } => {
                write!(f, "Annotation error: {}", reason)
            }
            EcogError::Io { path, message } => {
                write!(f, "I/O error on {}: {}", path.display(), message)
            }
            EcogError::Storage { reason } => {
                write!(f, "Storage error: {}", reason)
            }
        }
    }
}

impl std::error::Error for EcogError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::EcogError::InvalidConfig {
            reason: format!($($arg)+)
        }
    };
}

/// Convenience macro for creating malformed segment errors
#[macro_export]
macro_rules! segment_error {
    ($($arg:tt)+) => {
        $crate::error::EcogError::MalformedSegment {
            reason: format!($($arg)+)
        }
    };
}
