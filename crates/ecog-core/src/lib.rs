//! ECoG-Core: Foundation types for the ECoG feature pipeline
//!
//! Recording access, channel classification, event sets and the shared error type.

pub mod error;
pub mod channel;
pub mod recording;
pub mod events;
pub mod edf;

pub use error::{EcogError, EcogResult};
pub use channel::{ChannelKind, ChannelRule, ChannelRules};
pub use recording::{MemoryRecording, RecordingLoader, RecordingSource};
pub use events::{AnnotationDictionary, EventAnnotations, EventSet, EventSource};
pub use edf::{EdfChannel, EdfLoader, EdfRecording};
