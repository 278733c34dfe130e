//! ECoG-Batch: Feature extraction over recording directories
//!
//! Discovery, session filtering and the bounded-parallel orchestrator behind
//! the `ecog-features` binary.

pub mod cli;
pub mod logging;
pub mod discovery;
pub mod orchestrator;

pub use cli::Args;
pub use discovery::{discover_recordings, filter_known_sessions};
pub use orchestrator::{BatchConfig, BatchOrchestrator, BatchSummary, ProgressEvent};

/// Environment variable naming an optional JSON batch configuration
pub const CONFIG_ENV: &str = "ECOG_CONFIG";
