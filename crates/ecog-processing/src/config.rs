//! Configuration management for feature extraction

use ecog_core::{config_error, ChannelRules, EcogError, EcogResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Taper applied to every Welch segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowFunction {
    /// Periodic Hann window
    Hann,
    /// Rectangular window
    Boxcar,
}

/// Trend removed from every Welch segment before tapering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detrend {
    None,
    /// Subtract the segment mean
    Constant,
    /// Subtract the least-squares line
    Linear,
}

/// Welch PSD parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelchConfig {
    /// Samples per segment; shorter inputs use their full length
    pub segment_len: usize,
    /// Fraction of a segment shared with the next one, in `[0, 1)`
    pub overlap: f64,
    pub window: WindowFunction,
    pub detrend: Detrend,
    /// Sampling frequency for the frequency axis; `None` uses the recording rate
    pub sampling_rate: Option<f64>,
}

/// Wall-clock origin that window times are measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOrigin {
    /// Recording start time from the file header
    RecordingStart,
    /// Earliest prediction time reported for the recording
    EarliestPrediction,
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Window length in seconds
    pub window_seconds: f64,
    /// Sampling rate recordings are expected to have; a mismatch is logged
    pub expected_sampling_rate: Option<f64>,
    pub welch: WelchConfig,
    pub channel_rules: ChannelRules,
    pub time_origin: TimeOrigin,
    /// Directory receiving one dataset per recording
    pub output_dir: PathBuf,
    /// Extension of recording files, without the dot
    pub recording_extension: String,
}

impl WelchConfig {
    /// scipy-compatible defaults: 256-sample Hann segments, 50% overlap, mean removal
    pub fn standard() -> Self {
        Self {
            segment_len: 256,
            overlap: 0.5,
            window: WindowFunction::Hann,
            detrend: Detrend::Constant,
            sampling_rate: None,
        }
    }

    /// Validate Welch parameters
    pub fn validate(&self) -> EcogResult<()> {
        if self.segment_len == 0 {
            return Err(config_error!("Welch segment length must be greater than 0"));
        }

        if !(0.0..1.0).contains(&self.overlap) {
            return Err(config_error!("Welch overlap {} outside of [0, 1)", self.overlap));
        }

        if let Some(rate) = self.sampling_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(EcogError::InvalidSamplingRate { rate });
            }
        }

        Ok(())
    }
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExtractionConfig {
    /// Defaults for 1 kHz clinical ECoG recordings
    pub fn ecog_default() -> Self {
        Self {
            window_seconds: 10.0,
            expected_sampling_rate: Some(1000.0),
            welch: WelchConfig::standard(),
            channel_rules: ChannelRules::ecog_default(),
            time_origin: TimeOrigin::RecordingStart,
            output_dir: PathBuf::from("classifier_data"),
            recording_extension: "edf".to_string(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> EcogResult<()> {
        if !(self.window_seconds.is_finite() && self.window_seconds > 0.0) {
            return Err(config_error!(
                "Window length must be positive, got {}s",
                self.window_seconds
            ));
        }

        if let Some(rate) = self.expected_sampling_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(EcogError::InvalidSamplingRate { rate });
            }
        }

        self.welch.validate().map_err(|e| config_error!("Welch configuration invalid: {}", e))?;

        if self.channel_rules.rules.is_empty() {
            return Err(config_error!("At least one channel rule is required"));
        }

        if self.recording_extension.is_empty() || self.recording_extension.starts_with('.') {
            return Err(config_error!(
                "Recording extension '{}' must be non-empty and given without a dot",
                self.recording_extension
            ));
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> EcogResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| config_error!("Failed to serialize configuration: {}", e))
    }

    /// Import configuration from JSON; missing fields take their default values
    pub fn from_json(json: &str) -> EcogResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| config_error!("Failed to deserialize configuration: {}", e))
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EcogResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| EcogError::io(path, e))?;
        let config = Self::from_json(&json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::ecog_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ExtractionConfig::ecog_default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_seconds, 10.0);
        assert_eq!(config.welch.segment_len, 256);
        assert_eq!(config.output_dir, PathBuf::from("classifier_data"));
    }

    #[test]
    fn test_config_serialization() {
        let mut config = ExtractionConfig::ecog_default();
        config.time_origin = TimeOrigin::EarliestPrediction;
        config.welch.detrend = Detrend::Linear;

        let json = config.to_json().unwrap();
        let restored = ExtractionConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ExtractionConfig::from_json(r#"{"window_seconds": 4.0, "output_dir": "features"}"#).unwrap();
        assert_eq!(config.window_seconds, 4.0);
        assert_eq!(config.output_dir, PathBuf::from("features"));
        assert_eq!(config.welch, WelchConfig::standard());
        assert_eq!(config.recording_extension, "edf");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ExtractionConfig::ecog_default();
        config.window_seconds = 0.0;
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::ecog_default();
        config.welch.overlap = 1.0;
        assert!(matches!(config.validate(), Err(EcogError::InvalidConfig { .. })));

        let mut config = ExtractionConfig::ecog_default();
        config.recording_extension = ".edf".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"output_dir": "out", "welch": {"segment_len": 128, "overlap": 0.25, "window": "Boxcar", "detrend": "None", "sampling_rate": null}}"#).unwrap();

        let config = ExtractionConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.welch.window, WindowFunction::Boxcar);

        assert!(matches!(
            ExtractionConfig::load(dir.path().join("missing.json")),
            Err(EcogError::Io { .. })
        ));
    }
}
