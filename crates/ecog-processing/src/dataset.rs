//! Per-recording feature datasets and their on-disk form
//!
//! A dataset is stored as a NumPy `.npz` archive holding the non-event matrix
//! under `"0"`, the event matrix under `"1"` and the shared frequency axis
//! under `"freqs"`. Class keys are only present when the class has rows.

use crate::config::ExtractionConfig;
use crate::labeler::WindowLabel;
use ecog_core::{EcogError, EcogResult};
use npyz::npz::{NpzArchive, NpzWriter};
use npyz::WriterBuilder;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key of the frequency axis in the archive
pub const FREQS_KEY: &str = "freqs";

/// Dense row-major matrix of feature rows
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Wrap a flat row-major buffer of `rows * cols` values
    pub fn from_rows_flat(rows: usize, cols: usize, data: Vec<f64>) -> EcogResult<Self> {
        if rows * cols != data.len() {
            return Err(EcogError::Storage {
                reason: format!(
                    "{} values do not form a {}x{} matrix",
                    data.len(),
                    rows,
                    cols
                ),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index < self.rows {
            Some(&self.data[index * self.cols..(index + 1) * self.cols])
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Class matrices and frequency axis of one recording
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDataset {
    pub freqs: Vec<f64>,
    pub non_event: Option<FeatureMatrix>,
    pub event: Option<FeatureMatrix>,
}

impl FeatureDataset {
    pub fn get(&self, label: WindowLabel) -> Option<&FeatureMatrix> {
        match label {
            WindowLabel::NonEvent => self.non_event.as_ref(),
            WindowLabel::Event => self.event.as_ref(),
        }
    }

    /// Number of rows of a class
    pub fn rows(&self, label: WindowLabel) -> usize {
        self.get(label).map_or(0, FeatureMatrix::rows)
    }

    /// Archive keys present in this dataset
    pub fn keys(&self) -> Vec<&'static str> {
        [WindowLabel::NonEvent, WindowLabel::Event]
            .into_iter()
            .filter(|&label| self.get(label).is_some())
            .map(WindowLabel::tag)
            .chain(std::iter::once(FREQS_KEY))
            .collect()
    }
}

/// Persists datasets, one per recording
pub trait DatasetWriter: Send + Sync {
    /// Write `dataset` under `name` and return the written path
    fn write(&self, name: &str, dataset: &FeatureDataset) -> EcogResult<PathBuf>;
}

/// Writes `.npz` archives into an output directory
#[derive(Debug, Clone)]
pub struct NpzDatasetWriter {
    output_dir: PathBuf,
}

impl NpzDatasetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Archive path for a recording name
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.npz", name))
    }

    fn write_archive(&self, path: &Path, dataset: &FeatureDataset) -> io::Result<()> {
        let mut npz = NpzWriter::create(path)?;

        for label in [WindowLabel::NonEvent, WindowLabel::Event] {
            if let Some(matrix) = dataset.get(label) {
                write_matrix(&mut npz, label.tag(), matrix)?;
            }
        }

        let mut freqs = npz
            .array::<f64>(FREQS_KEY, Default::default())?
            .default_dtype()
            .shape(&[dataset.freqs.len() as u64])
            .begin_nd()?;
        freqs.extend(dataset.freqs.iter().copied())?;
        freqs.finish()?;

        let mut file = npz
            .zip_writer()
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        file.flush()
    }
}

fn write_matrix<W: Write + Seek>(
    npz: &mut NpzWriter<W>,
    key: &str,
    matrix: &FeatureMatrix,
) -> io::Result<()> {
    let mut writer = npz
        .array::<f64>(key, Default::default())?
        .default_dtype()
        .shape(&[matrix.rows() as u64, matrix.cols() as u64])
        .begin_nd()?;

    writer.extend(matrix.as_slice().iter().copied())?;
    debug!("Wrote '{}' as {}x{}", key, matrix.rows(), matrix.cols());
    writer.finish()
}

impl DatasetWriter for NpzDatasetWriter {
    fn write(&self, name: &str, dataset: &FeatureDataset) -> EcogResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| EcogError::io(&self.output_dir, e))?;

        let path = self.output_path(name);
        let partial = self.output_dir.join(format!("{}.npz.partial", name));

        if let Err(e) = self.write_archive(&partial, dataset) {
            let _ = std::fs::remove_file(&partial);
            return Err(EcogError::Storage {
                reason: format!("Failed to write {}: {}", path.display(), e),
            });
        }
        std::fs::rename(&partial, &path).map_err(|e| EcogError::io(&path, e))?;

        Ok(path)
    }
}

/// Read a dataset archive back
pub fn read_dataset(path: impl AsRef<Path>) -> EcogResult<FeatureDataset> {
    let path = path.as_ref();
    let storage = |e: io::Error| EcogError::Storage {
        reason: format!("Failed to read {}: {}", path.display(), e),
    };

    let mut archive = NpzArchive::open(path).map_err(storage)?;

    let freqs = match archive.by_name(FREQS_KEY).map_err(storage)? {
        Some(array) => array.into_vec::<f64>().map_err(storage)?,
        None => {
            return Err(EcogError::Storage {
                reason: format!("{} has no '{}' array", path.display(), FREQS_KEY),
            })
        }
    };

    let mut matrix = |label: WindowLabel| -> EcogResult<Option<FeatureMatrix>> {
        let Some(array) = archive.by_name(label.tag()).map_err(storage)? else {
            return Ok(None);
        };
        let (rows, cols) = match array.shape() {
            [rows, cols] => (*rows as usize, *cols as usize),
            shape => {
                return Err(EcogError::Storage {
                    reason: format!("array '{}' has shape {:?}", label.tag(), shape),
                })
            }
        };
        let data = array.into_vec::<f64>().map_err(storage)?;
        FeatureMatrix::from_rows_flat(rows, cols, data).map(Some)
    };

    let non_event = matrix(WindowLabel::NonEvent)?;
    let event = matrix(WindowLabel::Event)?;

    Ok(FeatureDataset {
        freqs,
        non_event,
        event,
    })
}
