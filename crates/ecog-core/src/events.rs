//! Event timestamps, prediction annotations and the annotation dictionary

use crate::error::{EcogError, EcogResult};
use chrono::{Duration, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// Recording-local event timestamps with set semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    times: BTreeSet<NaiveDateTime>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an event set from offsets in seconds relative to `origin`
    pub fn from_offsets(origin: NaiveDateTime, offsets_secs: &[f64]) -> Self {
        offsets_secs
            .iter()
            .map(|&secs| origin + seconds(secs))
            .collect()
    }

    /// Add an event; returns false when the timestamp was already present
    pub fn insert(&mut self, time: NaiveDateTime) -> bool {
        self.times.insert(time)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate events in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.times.iter()
    }

    /// True when some event lies in `[start, end]`, boundaries included
    pub fn any_within(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if start > end {
            return false;
        }
        self.times.range(start..=end).next().is_some()
    }

    /// Union of two event sets
    pub fn union(&self, other: &EventSet) -> EventSet {
        Self {
            times: self.times.union(&other.times).copied().collect(),
        }
    }
}

impl FromIterator<NaiveDateTime> for EventSet {
    fn from_iter<I: IntoIterator<Item = NaiveDateTime>>(iter: I) -> Self {
        Self {
            times: iter.into_iter().collect(),
        }
    }
}

impl Extend<NaiveDateTime> for EventSet {
    fn extend<I: IntoIterator<Item = NaiveDateTime>>(&mut self, iter: I) {
        self.times.extend(iter);
    }
}

/// Convert fractional seconds into a chrono duration with nanosecond resolution
pub fn seconds(secs: f64) -> Duration {
    Duration::nanoseconds((secs * 1e9).round() as i64)
}

/// Everything the annotation collaborator knows about one recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventAnnotations {
    /// Moments of interest
    pub events: EventSet,
    /// Times at which the classifier produced a prediction
    pub prediction_times: Vec<NaiveDateTime>,
    /// Correctness of each prediction, parallel to `prediction_times`
    pub correctness: Vec<f64>,
}

impl EventAnnotations {
    /// True when the collaborator produced any prediction time
    pub fn has_times(&self) -> bool {
        !self.prediction_times.is_empty()
    }

    /// Earliest prediction time
    pub fn earliest_prediction(&self) -> Option<NaiveDateTime> {
        self.prediction_times.iter().min().copied()
    }

    /// Mean correctness over all predictions
    pub fn mean_correctness(&self) -> Option<f64> {
        if self.correctness.is_empty() {
            None
        } else {
            Some(self.correctness.iter().sum::<f64>() / self.correctness.len() as f64)
        }
    }
}

/// Produces events and predictions for a recording
pub trait EventSource: Send + Sync {
    fn annotations(
        &self,
        recording_path: &Path,
        recording_start: NaiveDateTime,
        dictionary: &AnnotationDictionary,
    ) -> EcogResult<EventAnnotations>;
}

/// Session identifier of a recording: its file name without extension
pub fn session_id(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// JSON mapping from session identifiers to per-session annotation data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationDictionary {
    entries: Map<String, Value>,
}

impl AnnotationDictionary {
    /// Load the dictionary from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EcogResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EcogError::io(path, e))?;
        Self::from_json(&text).map_err(|e| match e {
            EcogError::Annotation { reason } => EcogError::Annotation {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })
    }

    /// Parse the dictionary from JSON text; the top level must be an object
    pub fn from_json(json: &str) -> EcogResult<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| EcogError::Annotation {
            reason: format!("Failed to parse annotation dictionary: {}", e),
        })?;

        match value {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(EcogError::Annotation {
                reason: "annotation dictionary must be a JSON object".to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// First key that contains `session` as a substring
    pub fn matching_key(&self, session: &str) -> Option<&str> {
        self.keys().find(|key| key.contains(session))
    }

    /// True when some key contains `session` as a substring
    pub fn contains_session(&self, session: &str) -> bool {
        self.matching_key(session).is_some()
    }
}
