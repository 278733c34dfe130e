//! Event source backed by the real-time prediction file
//!
//! The file maps session identifiers to the events observed during the
//! session and the classifier predictions made in real time, both as seconds
//! since the recording start:
//!
//! ```json
//! { "a1b2c3_3": { "events": [45.0, 312.5],
//!                 "predictions": [{ "elapsed": 12.0, "correct": 1.0 }] } }
//! ```

use chrono::NaiveDateTime;
use ecog_core::events::{seconds, session_id};
use ecog_core::{AnnotationDictionary, EcogError, EcogResult, EventAnnotations, EventSet, EventSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One real-time classifier prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Seconds since the recording start
    pub elapsed: f64,
    /// Correctness of the prediction, 0.0 to 1.0
    pub correct: f64,
}

/// Events and predictions of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPredictions {
    #[serde(default)]
    pub events: Vec<f64>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// Contents of a real-time prediction file
pub type PredictionFile = BTreeMap<String, SessionPredictions>;

pub struct PredictionFileEventSource {
    sessions: PredictionFile,
    classifier: PathBuf,
}

impl PredictionFileEventSource {
    /// Build from parsed sessions and the classifier that produced them
    pub fn new(sessions: PredictionFile, classifier: impl Into<PathBuf>) -> Self {
        Self {
            sessions,
            classifier: classifier.into(),
        }
    }

    /// Load the prediction file; the classifier location must exist
    pub fn load(realtime_file: impl AsRef<Path>, classifier: impl AsRef<Path>) -> EcogResult<Self> {
        let realtime_file = realtime_file.as_ref();
        let classifier = classifier.as_ref();

        std::fs::metadata(classifier).map_err(|e| EcogError::io(classifier, e))?;

        let json = std::fs::read_to_string(realtime_file).map_err(|e| EcogError::io(realtime_file, e))?;
        let sessions: PredictionFile = serde_json::from_str(&json).map_err(|e| EcogError::Annotation {
            reason: format!("Failed to parse {}: {}", realtime_file.display(), e),
        })?;

        info!(
            "Loaded predictions for {} sessions from {} (classifier {})",
            sessions.len(),
            realtime_file.display(),
            classifier.display()
        );
        Ok(Self::new(sessions, classifier))
    }

    pub fn classifier(&self) -> &Path {
        &self.classifier
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, session: &str) -> Option<&SessionPredictions> {
        self.sessions
            .iter()
            .find(|(key, _)| key.contains(session))
            .map(|(_, predictions)| predictions)
    }
}

impl EventSource for PredictionFileEventSource {
    fn annotations(
        &self,
        recording_path: &Path,
        recording_start: NaiveDateTime,
        dictionary: &AnnotationDictionary,
    ) -> EcogResult<EventAnnotations> {
        let Some(session) = session_id(recording_path) else {
            return Ok(EventAnnotations::default());
        };

        if !dictionary.contains_session(&session) {
            debug!("Session {} not in annotation dictionary", session);
            return Ok(EventAnnotations::default());
        }

        let Some(predictions) = self.session(&session) else {
            return Ok(EventAnnotations::default());
        };

        Ok(EventAnnotations {
            events: EventSet::from_offsets(recording_start, &predictions.events),
            prediction_times: predictions
                .predictions
                .iter()
                .map(|p| recording_start + seconds(p.elapsed))
                .collect(),
            correctness: predictions.predictions.iter().map(|p| p.correct).collect(),
        })
    }
}
