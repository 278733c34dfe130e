//! Per-class feature row accumulation and frequency axis tracking

use crate::dataset::FeatureMatrix;
use crate::labeler::WindowLabel;
use ecog_core::{EcogError, EcogResult};

const AXIS_TOLERANCE: f64 = 1e-9;

/// Growing row-major matrix with a row length fixed by the first row
#[derive(Debug, Clone, Default)]
pub struct ClassAccumulator {
    data: Vec<f64>,
    row_len: Option<usize>,
    rows: usize,
}

impl ClassAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one feature row
    pub fn append(&mut self, row: &[f64]) -> EcogResult<()> {
        match self.row_len {
            Some(expected) if expected != row.len() => {
                return Err(EcogError::RowLengthMismatch {
                    expected,
                    actual: row.len(),
                });
            }
            None if row.is_empty() => {
                return Err(EcogError::RowLengthMismatch { expected: 1, actual: 0 });
            }
            None => self.row_len = Some(row.len()),
            Some(_) => {}
        }

        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_len(&self) -> Option<usize> {
        self.row_len
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Hand the buffer over as a matrix; `None` when no row was appended
    pub fn into_matrix(self) -> Option<FeatureMatrix> {
        let cols = self.row_len?;
        FeatureMatrix::from_rows_flat(self.rows, cols, self.data).ok()
    }
}

/// Frequency axis of a recording, established by the first successful window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyAxis {
    freqs: Option<Vec<f64>>,
}

impl FrequencyAxis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt `freqs` when unset, otherwise require it to equal the established axis
    pub fn check_or_set(&mut self, freqs: &[f64]) -> EcogResult<()> {
        if self.freqs.is_none() {
            self.freqs = Some(freqs.to_vec());
            return Ok(());
        }

        let axis = self.freqs.as_deref().unwrap_or_default();

        let matches = axis.len() == freqs.len()
            && axis
                .iter()
                .zip(freqs)
                .all(|(a, b)| (a - b).abs() <= AXIS_TOLERANCE);
        if !matches {
            return Err(EcogError::FrequencyAxisMismatch {
                expected: axis.len(),
                actual: freqs.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self) -> Option<&[f64]> {
        self.freqs.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.freqs.is_some()
    }

    pub fn into_inner(self) -> Option<Vec<f64>> {
        self.freqs
    }
}

/// One accumulator per window class
#[derive(Debug, Clone, Default)]
pub struct ClassAccumulators {
    pub non_event: ClassAccumulator,
    pub event: ClassAccumulator,
}

impl ClassAccumulators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: WindowLabel) -> &ClassAccumulator {
        match label {
            WindowLabel::NonEvent => &self.non_event,
            WindowLabel::Event => &self.event,
        }
    }

    /// Route a row to the accumulator of its class
    pub fn append(&mut self, label: WindowLabel, row: &[f64]) -> EcogResult<()> {
        match label {
            WindowLabel::NonEvent => self.non_event.append(row),
            WindowLabel::Event => self.event.append(row),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.non_event.is_empty() && self.event.is_empty()
    }
}
