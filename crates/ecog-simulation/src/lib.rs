//! ECoG-Simulation: Synthetic recordings for testing and development
//!
//! Deterministic multichannel recordings, an EDF writer and scripted
//! collaborators for exercising the pipeline without clinical data.

pub mod signal_patterns;
pub mod ecog_simulator;
pub mod edf_writer;
pub mod scripted;

pub use signal_patterns::*;
pub use ecog_simulator::*;
pub use edf_writer::write_edf;
pub use scripted::*;
