//! Recording access: the trait the pipeline reads through plus an in-memory source

use crate::error::{EcogError, EcogResult};
use chrono::NaiveDateTime;
use std::path::Path;

/// Random-access view of one multichannel recording.
///
/// Implementations are opened per recording, owned by a single worker and
/// dropped once the recording has been processed.
pub trait RecordingSource: Send {
    /// Channel names in file order
    fn channel_names(&self) -> &[String];

    /// Sampling rate in Hz
    fn sampling_rate(&self) -> f64;

    /// Number of samples per channel
    fn sample_count(&self) -> usize;

    /// Wall-clock time of the first sample
    fn start_time(&self) -> NaiveDateTime;

    /// Map a pipeline sample index to the index space of the data source
    fn native_index(&self, sample: usize) -> usize {
        sample
    }

    /// Read samples `start..end` of the picked channels as `[channel][sample]`
    fn read(&mut self, picks: &[usize], start: usize, end: usize) -> EcogResult<Vec<Vec<f64>>>;

    /// Get recording duration in seconds
    fn duration_secs(&self) -> f64 {
        if self.sampling_rate() > 0.0 {
            self.sample_count() as f64 / self.sampling_rate()
        } else {
            0.0
        }
    }
}

/// Opens recordings by path
pub trait RecordingLoader: Send + Sync {
    fn open(&self, path: &Path) -> EcogResult<Box<dyn RecordingSource>>;
}

/// Validate a half-open read range against the recording length
pub fn check_read_range(start: usize, end: usize, available: usize) -> EcogResult<()> {
    if start >= end || end > available {
        return Err(EcogError::ReadRange { start, end, available });
    }
    Ok(())
}

/// Validate channel picks against the channel count
pub fn check_picks(picks: &[usize], channel_count: usize) -> EcogResult<()> {
    if let Some(&index) = picks.iter().find(|&&idx| idx >= channel_count) {
        return Err(EcogError::ChannelOutOfRange { index, channel_count });
    }
    Ok(())
}

/// Fully loaded recording held in memory
#[derive(Debug, Clone)]
pub struct MemoryRecording {
    channel_names: Vec<String>,
    sampling_rate: f64,
    start_time: NaiveDateTime,
    /// Samples stored per channel
    data: Vec<Vec<f64>>,
}

impl MemoryRecording {
    /// Create an in-memory recording; every channel must have the same length
    pub fn new(
        channel_names: Vec<String>,
        sampling_rate: f64,
        start_time: NaiveDateTime,
        data: Vec<Vec<f64>>,
    ) -> EcogResult<Self> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(EcogError::InvalidSamplingRate { rate: sampling_rate });
        }

        if channel_names.len() != data.len() {
            return Err(EcogError::InvalidConfig {
                reason: format!(
                    "{} channel names for {} data channels",
                    channel_names.len(),
                    data.len()
                ),
            });
        }

        if let Some(first) = data.first() {
            if data.iter().any(|channel| channel.len() != first.len()) {
                return Err(EcogError::InvalidConfig {
                    reason: "channels have different sample counts".to_string(),
                });
            }
        }

        Ok(Self {
            channel_names,
            sampling_rate,
            start_time,
            data,
        })
    }

    /// Get data for a specific channel
    pub fn channel_data(&self, channel_index: usize) -> EcogResult<&[f64]> {
        self.data
            .get(channel_index)
            .map(Vec::as_slice)
            .ok_or(EcogError::ChannelOutOfRange {
                index: channel_index,
                channel_count: self.data.len(),
            })
    }
}

impl RecordingSource for MemoryRecording {
    fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn sample_count(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    fn read(&mut self, picks: &[usize], start: usize, end: usize) -> EcogResult<Vec<Vec<f64>>> {
        check_picks(picks, self.data.len())?;
        check_read_range(start, end, self.sample_count())?;

        Ok(picks
            .iter()
            .map(|&ch| self.data[ch][start..end].to_vec())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    fn two_channel() -> MemoryRecording {
        MemoryRecording::new(
            vec!["GRID1".to_string(), "ECG".to_string()],
            100.0,
            start(),
            vec![(0..500).map(f64::from).collect(), vec![0.5; 500]],
        )
        .unwrap()
    }

    #[test]
    fn test_memory_recording_metadata() {
        let recording = two_channel();
        assert_eq!(recording.sample_count(), 500);
        assert_eq!(recording.channel_names().len(), 2);
        assert!((recording.duration_secs() - 5.0).abs() < 1e-12);
        assert_eq!(recording.native_index(42), 42);
    }

    #[test]
    fn test_read_range() {
        let mut recording = two_channel();
        let data = recording.read(&[0], 10, 20).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0], (10..20).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_read_past_end_is_value_error() {
        let mut recording = two_channel();
        let error = recording.read(&[0, 1], 400, 600).unwrap_err();
        assert_eq!(error, EcogError::ReadRange { start: 400, end: 600, available: 500 });
        assert!(error.is_value_error());
    }

    #[test]
    fn test_bad_pick_is_not_value_error() {
        let mut recording = two_channel();
        let error = recording.read(&[5], 0, 10).unwrap_err();
        assert!(!error.is_value_error());
    }

    #[test]
    fn test_mismatched_channels_rejected() {
        let result = MemoryRecording::new(
            vec!["A".to_string(), "B".to_string()],
            100.0,
            start(),
            vec![vec![0.0; 10], vec![0.0; 11]],
        );
        assert!(result.is_err());

        let result = MemoryRecording::new(vec![], 0.0, start(), vec![]);
        assert!(matches!(result, Err(EcogError::InvalidSamplingRate { .. })));
    }
}
