//! EDF / EDF+ recordings through `edfplus`
//!
//! Sample data is read per channel on demand, so long clinical recordings
//! never have to fit in memory. The `EDF Annotations` signal of EDF+ files is
//! not exposed as a channel, and discontinuous `EDF+D` files are refused.

use crate::error::{EcogError, EcogResult};
use crate::recording::{check_picks, check_read_range, RecordingLoader, RecordingSource};
use crate::segment_error;
use chrono::NaiveDateTime;
use edfplus::EdfReader;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const ANNOTATION_LABEL: &str = "EDF Annotations";
/// Byte range of the `reserved` field in the fixed header
const RESERVED_FIELD: std::ops::Range<usize> = 192..236;
const DISCONTINUOUS: &str = "EDF+D";
/// `edfplus` reports durations in units of 100 ns
const TIME_UNITS_PER_SECOND: f64 = 10_000_000.0;

/// Exposed signal of an EDF file
#[derive(Debug, Clone, PartialEq)]
pub struct EdfChannel {
    pub label: String,
    /// Signal index inside the `edfplus` header
    pub signal: usize,
    pub samples_per_record: usize,
    pub physical_min: f64,
    pub physical_max: f64,
}

impl EdfChannel {
    /// Largest rounding error of the 16-bit digital encoding
    pub fn resolution(&self) -> f64 {
        (self.physical_max - self.physical_min) / 65535.0
    }
}

/// Recording backed by an EDF file
pub struct EdfRecording {
    path: PathBuf,
    reader: EdfReader,
    channels: Vec<EdfChannel>,
    channel_names: Vec<String>,
    samples_per_record: usize,
    sample_count: usize,
    sampling_rate: f64,
    start_time: NaiveDateTime,
}

impl EdfRecording {
    /// Open a recording and read its header
    pub fn open(path: impl AsRef<Path>) -> EcogResult<Self> {
        let path = path.as_ref().to_path_buf();
        check_continuous(&path)?;

        let reader = EdfReader::open(&path).map_err(|e| EcogError::format(&path, e.to_string()))?;
        let header = reader.header();

        let record_duration = header.datarecord_duration as f64 / TIME_UNITS_PER_SECOND;
        if !(record_duration.is_finite() && record_duration > 0.0) {
            return Err(EcogError::format(
                &path,
                format!("invalid record duration {}", record_duration),
            ));
        }

        let channels: Vec<EdfChannel> = header
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.label.trim() != ANNOTATION_LABEL)
            .map(|(i, s)| EdfChannel {
                label: s.label.trim().to_string(),
                signal: i,
                samples_per_record: s.samples_per_record as usize,
                physical_min: s.physical_min,
                physical_max: s.physical_max,
            })
            .collect();

        let first = channels
            .first()
            .ok_or_else(|| EcogError::format(&path, "no data signals"))?;
        let samples_per_record = first.samples_per_record;
        let sampling_rate = samples_per_record as f64 / record_duration;
        if samples_per_record == 0 {
            return Err(EcogError::InvalidSamplingRate { rate: sampling_rate });
        }

        let record_count = header.datarecords_in_file.max(0) as usize;
        let start_time = header.start_date.and_time(header.start_time);
        let channel_names: Vec<String> = channels.iter().map(|c| c.label.clone()).collect();

        debug!(
            "Opened {}: {} channels, {} records at {}Hz",
            path.display(),
            channel_names.len(),
            record_count,
            sampling_rate
        );

        Ok(Self {
            path,
            reader,
            channels,
            channel_names,
            samples_per_record,
            sample_count: record_count * samples_per_record,
            sampling_rate,
            start_time,
        })
    }

    /// Exposed signals, in channel order
    pub fn channels(&self) -> &[EdfChannel] {
        &self.channels
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Refuse `EDF+D` files, whose data records are not back to back in time
fn check_continuous(path: &Path) -> EcogResult<()> {
    let mut fixed = [0u8; RESERVED_FIELD.end];
    let mut file = File::open(path).map_err(|e| EcogError::io(path, e))?;
    file.read_exact(&mut fixed).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => EcogError::format(path, "truncated header"),
        _ => EcogError::io(path, e),
    })?;

    let reserved = String::from_utf8_lossy(&fixed[RESERVED_FIELD]);
    if reserved.trim_start().starts_with(DISCONTINUOUS) {
        return Err(EcogError::format(path, "discontinuous EDF+D recordings are not supported"));
    }
    Ok(())
}

impl RecordingSource for EdfRecording {
    fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    fn read(&mut self, picks: &[usize], start: usize, end: usize) -> EcogResult<Vec<Vec<f64>>> {
        check_picks(picks, self.channels.len())?;
        check_read_range(start, end, self.sample_count)?;

        for &pick in picks {
            let channel = &self.channels[pick];
            if channel.samples_per_record != self.samples_per_record {
                return Err(segment_error!(
                    "channel {} has {} samples per record, expected {}",
                    channel.label,
                    channel.samples_per_record,
                    self.samples_per_record
                ));
            }
        }

        let mut out = Vec::with_capacity(picks.len());
        for &pick in picks {
            let signal = self.channels[pick].signal;
            self.reader
                .seek(signal, start as i64)
                .map_err(|e| segment_error!("cannot seek {} to sample {}: {}", self.channel_names[pick], start, e))?;
            let samples = self
                .reader
                .read_physical_samples(signal, end - start)
                .map_err(|e| segment_error!("cannot read {}: {}", self.channel_names[pick], e))?;
            if samples.len() != end - start {
                return Err(segment_error!(
                    "channel {} is truncated: got {} of {} samples",
                    self.channel_names[pick],
                    samples.len(),
                    end - start
                ));
            }
            out.push(samples);
        }
        Ok(out)
    }
}

/// Loader opening recordings as EDF files
#[derive(Debug, Clone, Copy, Default)]
pub struct EdfLoader;

impl RecordingLoader for EdfLoader {
    fn open(&self, path: &Path) -> EcogResult<Box<dyn RecordingSource>> {
        Ok(Box::new(EdfRecording::open(path)?))
    }
}
