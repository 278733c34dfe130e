//! Multichannel ECoG recording simulator

use crate::signal_patterns::SignalPattern;
use chrono::{NaiveDate, NaiveDateTime};
use ecog_core::{config_error, EcogError, EcogResult, MemoryRecording};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One simulated channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub pattern: SignalPattern,
}

impl ChannelSpec {
    pub fn new(name: &str, pattern: SignalPattern) -> Self {
        Self {
            name: name.to_string(),
            pattern,
        }
    }
}

/// Configuration for recording simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Recording length in seconds
    pub duration_secs: f64,
    /// Wall-clock time of the first sample
    pub start_time: NaiveDateTime,
    pub channels: Vec<ChannelSpec>,
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub noise_std: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Clinical montage: `grid_channels` cortical grid electrodes plus one ECG lead
    pub fn clinical_montage(grid_channels: usize, duration_secs: f64) -> Self {
        let mut channels: Vec<ChannelSpec> = (1..=grid_channels)
            .map(|i| ChannelSpec::new(&format!("GRID{}", i), SignalPattern::cortical()))
            .collect();
        channels.push(ChannelSpec::new(
            "ECG",
            SignalPattern::Cardiac {
                heart_rate_bpm: 72.0,
                amplitude: 800.0,
            },
        ));

        Self {
            channels,
            duration_secs,
            ..Self::default()
        }
    }

    /// Replace the channel set
    pub fn with_channels(mut self, channels: Vec<ChannelSpec>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sample_count(&self) -> usize {
        (self.duration_secs * self.sampling_rate).round() as usize
    }

    pub fn validate(&self) -> EcogResult<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(EcogError::InvalidSamplingRate {
                rate: self.sampling_rate,
            });
        }
        if !(self.duration_secs.is_finite() && self.duration_secs >= 0.0) {
            return Err(config_error!("Duration must be non-negative, got {}", self.duration_secs));
        }
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(config_error!("Noise level must be non-negative, got {}", self.noise_std));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 1000.0,
            duration_secs: 60.0,
            start_time: NaiveDate::from_ymd_opt(2018, 4, 9)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap_or_default(),
            channels: vec![ChannelSpec::new("GRID1", SignalPattern::cortical())],
            noise_std: 5.0,
            seed: None,
        }
    }
}

/// Generates in-memory recordings from a [`SimulationConfig`]
pub struct EcogSimulator {
    config: SimulationConfig,
    rng: StdRng,
    noise: Normal<f64>,
}

impl EcogSimulator {
    pub fn new(config: SimulationConfig) -> EcogResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| config_error!("Failed to create normal distribution: {}", e))?;

        Ok(Self { config, rng, noise })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Generate the full recording
    pub fn generate(&mut self) -> EcogResult<MemoryRecording> {
        let n = self.config.sample_count();
        let dt = 1.0 / self.config.sampling_rate;

        let mut data = Vec::with_capacity(self.config.channels.len());
        for channel in &self.config.channels {
            let samples: Vec<f64> = (0..n)
                .map(|i| channel.pattern.value_at(i as f64 * dt) + self.noise.sample(&mut self.rng))
                .collect();
            data.push(samples);
        }

        debug!(
            "Simulated {} channels x {} samples at {}Hz",
            data.len(),
            n,
            self.config.sampling_rate
        );

        MemoryRecording::new(
            self.config.channels.iter().map(|c| c.name.clone()).collect(),
            self.config.sampling_rate,
            self.config.start_time,
            data,
        )
    }
}
