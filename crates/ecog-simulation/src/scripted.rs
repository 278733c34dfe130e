//! Scripted collaborators: in-memory loaders, fault injection and fixed events

use chrono::NaiveDateTime;
use ecog_core::events::session_id;
use ecog_core::{
    segment_error, AnnotationDictionary, EcogError, EcogResult, EventAnnotations, EventSource,
    MemoryRecording, RecordingLoader, RecordingSource,
};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// How an injected fault surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Window-local value error
    Malformed,
    /// I/O error that aborts the recording
    Io,
}

/// Recording whose reads fail when they touch a faulty sample range
pub struct FaultyRecording<R> {
    inner: R,
    faults: Vec<(Range<usize>, FaultKind)>,
}

impl<R: RecordingSource> FaultyRecording<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            faults: Vec::new(),
        }
    }

    /// Fail reads overlapping `range` with `kind`
    pub fn with_fault(mut self, range: Range<usize>, kind: FaultKind) -> Self {
        self.faults.push((range, kind));
        self
    }
}

impl<R: RecordingSource> RecordingSource for FaultyRecording<R> {
    fn channel_names(&self) -> &[String] {
        self.inner.channel_names()
    }

    fn sampling_rate(&self) -> f64 {
        self.inner.sampling_rate()
    }

    fn sample_count(&self) -> usize {
        self.inner.sample_count()
    }

    fn start_time(&self) -> NaiveDateTime {
        self.inner.start_time()
    }

    fn native_index(&self, sample: usize) -> usize {
        self.inner.native_index(sample)
    }

    fn read(&mut self, picks: &[usize], start: usize, end: usize) -> EcogResult<Vec<Vec<f64>>> {
        let hit = self
            .faults
            .iter()
            .find(|(range, _)| range.start < end && start < range.end);

        match hit {
            Some((_, FaultKind::Malformed)) => Err(segment_error!("corrupt samples in {}..{}", start, end)),
            Some((_, FaultKind::Io)) => Err(EcogError::Io {
                path: PathBuf::from("<faulty>"),
                message: format!("read of {}..{} failed", start, end),
            }),
            None => self.inner.read(picks, start, end),
        }
    }
}

/// Loader serving recordings from memory, with optional faults per path
#[derive(Default)]
pub struct MemoryLoader {
    recordings: HashMap<PathBuf, MemoryRecording>,
    faults: HashMap<PathBuf, Vec<(Range<usize>, FaultKind)>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, recording: MemoryRecording) {
        self.recordings.insert(path.into(), recording);
    }

    pub fn insert_fault(&mut self, path: impl Into<PathBuf>, range: Range<usize>, kind: FaultKind) {
        self.faults.entry(path.into()).or_default().push((range, kind));
    }
}

impl RecordingLoader for MemoryLoader {
    fn open(&self, path: &Path) -> EcogResult<Box<dyn RecordingSource>> {
        let recording = self.recordings.get(path).cloned().ok_or_else(|| EcogError::Io {
            path: path.to_path_buf(),
            message: "no such recording".to_string(),
        })?;

        let faults = self.faults.get(path).cloned().unwrap_or_default();
        let faulty = faults
            .into_iter()
            .fold(FaultyRecording::new(recording), |rec, (range, kind)| rec.with_fault(range, kind));
        Ok(Box::new(faulty))
    }
}

/// Event source returning fixed annotations per session identifier
#[derive(Debug, Clone, Default)]
pub struct StaticEventSource {
    sessions: HashMap<String, EventAnnotations>,
}

impl StaticEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: &str, annotations: EventAnnotations) {
        self.sessions.insert(session.to_string(), annotations);
    }
}

impl EventSource for StaticEventSource {
    fn annotations(
        &self,
        recording_path: &Path,
        _recording_start: NaiveDateTime,
        _dictionary: &AnnotationDictionary,
    ) -> EcogResult<EventAnnotations> {
        Ok(session_id(recording_path)
            .and_then(|session| self.sessions.get(&session).cloned())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecog_simulator::{EcogSimulator, SimulationConfig};

    fn recording() -> MemoryRecording {
        let config = SimulationConfig::clinical_montage(2, 3.0).with_seed(3);
        EcogSimulator::new(config).unwrap().generate().unwrap()
    }

    #[test]
    fn test_faults_only_hit_overlapping_reads() {
        let mut faulty = FaultyRecording::new(recording())
            .with_fault(1000..1500, FaultKind::Malformed)
            .with_fault(2500..2600, FaultKind::Io);

        assert!(faulty.read(&[0], 0, 1000).is_ok());
        assert!(faulty.read(&[0], 999, 1001).unwrap_err().is_value_error());
        assert!(faulty.read(&[0], 1500, 2500).is_ok());
        assert!(!faulty.read(&[0], 2000, 3000).unwrap_err().is_value_error());
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.insert("/data/rec.edf", recording());
        loader.insert_fault("/data/rec.edf", 0..10, FaultKind::Malformed);

        let mut opened = loader.open(Path::new("/data/rec.edf")).unwrap();
        assert_eq!(opened.channel_names().len(), 3);
        assert!(opened.read(&[0], 0, 100).is_err());
        assert!(loader.open(Path::new("/data/other.edf")).is_err());
    }

    #[test]
    fn test_static_event_source() {
        let mut source = StaticEventSource::new();
        let annotations = EventAnnotations {
            prediction_times: vec![recording().start_time()],
            correctness: vec![1.0],
            ..EventAnnotations::default()
        };
        source.insert("rec", annotations.clone());

        let dictionary = AnnotationDictionary::default();
        let start = recording().start_time();
        assert_eq!(source.annotations(Path::new("/x/rec.edf"), start, &dictionary).unwrap(), annotations);
        assert!(!source.annotations(Path::new("/x/other.edf"), start, &dictionary).unwrap().has_times());
    }
}
