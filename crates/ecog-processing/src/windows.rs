//! Fixed-length, non-overlapping windowing of a recording

use chrono::{Duration, NaiveDateTime};
use ecog_core::{config_error, EcogError, EcogResult};

/// Number of samples in a window of `seconds` at `rate` Hz
pub fn window_len_samples(rate: f64, seconds: f64) -> EcogResult<usize> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(EcogError::InvalidSamplingRate { rate });
    }

    let samples = (rate * seconds).round();
    if !(samples.is_finite() && samples >= 1.0) {
        return Err(config_error!(
            "Window of {}s at {}Hz holds no samples",
            seconds,
            rate
        ));
    }
    Ok(samples as usize)
}

/// Time of sample `index` relative to the first sample.
///
/// Integral rates use exact integer arithmetic, so windows of a whole number
/// of seconds are exactly that long.
pub fn sample_offset(index: usize, rate: f64) -> Duration {
    if rate >= 1.0 && rate.fract() == 0.0 {
        let rate = rate as i128;
        let nanos = (index as i128 * 1_000_000_000 + rate / 2) / rate;
        Duration::nanoseconds(nanos as i64)
    } else {
        Duration::nanoseconds((index as f64 * 1e9 / rate).round() as i64)
    }
}

/// Lazy iterator over `(start, end)` sample ranges of consecutive windows.
///
/// The trailing partial window is dropped.
#[derive(Debug, Clone)]
pub struct WindowSplitter {
    window_len: usize,
    next: usize,
    count: usize,
}

impl WindowSplitter {
    pub fn new(total_samples: usize, window_len: usize) -> EcogResult<Self> {
        if window_len == 0 {
            return Err(config_error!("Window length must be at least one sample"));
        }

        Ok(Self {
            window_len,
            next: 0,
            count: total_samples / window_len,
        })
    }

    /// Total number of windows, independent of iteration progress
    pub fn window_count(&self) -> usize {
        self.count
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Attach wall-clock times measured from `origin`
    pub fn timed(self, origin: NaiveDateTime, rate: f64) -> TimedWindows {
        TimedWindows {
            splitter: self,
            origin,
            rate,
        }
    }
}

impl Iterator for WindowSplitter {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let start = self.next * self.window_len;
        self.next += 1;
        Some((start, start + self.window_len))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowSplitter {}

/// One analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: usize,
    pub start_sample: usize,
    /// One past the last sample
    pub end_sample: usize,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end_sample - self.start_sample
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Windows with wall-clock bounds
#[derive(Debug, Clone)]
pub struct TimedWindows {
    splitter: WindowSplitter,
    origin: NaiveDateTime,
    rate: f64,
}

impl Iterator for TimedWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.splitter.next;
        let (start, end) = self.splitter.next()?;
        Some(Window {
            index,
            start_sample: start,
            end_sample: end,
            start_time: self.origin + sample_offset(start, self.rate),
            end_time: self.origin + sample_offset(end, self.rate),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.splitter.size_hint()
    }
}

impl ExactSizeIterator for TimedWindows {}
