//! Deterministic waveform patterns for synthetic channels

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Noise-free waveform of a simulated channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalPattern {
    /// Flat line
    Silent,
    /// Single sinusoid
    Sinusoid { frequency: f64, amplitude: f64 },
    /// Sum of cortical rhythms as `(frequency, amplitude)` pairs
    Rhythms { bands: Vec<(f64, f64)> },
    /// Periodic narrow pulses approximating QRS complexes
    Cardiac { heart_rate_bpm: f64, amplitude: f64 },
    /// Sinusoid switched on only inside `[on_secs, off_secs)`
    Burst {
        frequency: f64,
        amplitude: f64,
        on_secs: f64,
        off_secs: f64,
    },
}

impl SignalPattern {
    /// Value at `time` seconds after the recording start
    pub fn value_at(&self, time: f64) -> f64 {
        match self {
            SignalPattern::Silent => 0.0,

            SignalPattern::Sinusoid { frequency, amplitude } => {
                amplitude * (2.0 * PI * frequency * time).sin()
            }

            SignalPattern::Rhythms { bands } => bands
                .iter()
                .map(|(frequency, amplitude)| amplitude * (2.0 * PI * frequency * time).sin())
                .sum(),

            SignalPattern::Cardiac { heart_rate_bpm, amplitude } => {
                let period = 60.0 / heart_rate_bpm;
                let phase = (time % period) / period;
                // Gaussian pulse of about 40ms width at the start of each beat
                let width = 0.02 / period;
                amplitude * (-(phase / width).powi(2)).exp()
            }

            SignalPattern::Burst { frequency, amplitude, on_secs, off_secs } => {
                if time >= *on_secs && time < *off_secs {
                    amplitude * (2.0 * PI * frequency * time).sin()
                } else {
                    0.0
                }
            }
        }
    }

    /// Alpha, beta and gamma rhythms with a falling amplitude spectrum
    pub fn cortical() -> Self {
        SignalPattern::Rhythms {
            bands: vec![(10.0, 40.0), (22.0, 15.0), (70.0, 5.0)],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalPattern::Silent => "Flat line",
            SignalPattern::Sinusoid { .. } => "Single sinusoid",
            SignalPattern::Rhythms { .. } => "Cortical rhythms",
            SignalPattern::Cardiac { .. } => "Cardiac pulses",
            SignalPattern::Burst { .. } => "Oscillatory burst",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_only_inside_interval() {
        let burst = SignalPattern::Burst {
            frequency: 5.0,
            amplitude: 1.0,
            on_secs: 1.0,
            off_secs: 2.0,
        };
        assert_eq!(burst.value_at(0.55), 0.0);
        assert!(burst.value_at(1.05).abs() > 0.5);
        assert_eq!(burst.value_at(2.05), 0.0);
    }

    #[test]
    fn test_cardiac_peaks_once_per_beat() {
        let ecg = SignalPattern::Cardiac {
            heart_rate_bpm: 60.0,
            amplitude: 1000.0,
        };
        assert!((ecg.value_at(0.0) - 1000.0).abs() < 1e-9);
        assert!((ecg.value_at(3.0) - 1000.0).abs() < 1e-6);
        assert!(ecg.value_at(0.5) < 1.0);
    }

    #[test]
    fn test_silent_and_rhythms() {
        assert_eq!(SignalPattern::Silent.value_at(12.3), 0.0);
        assert_eq!(SignalPattern::cortical().value_at(0.0), 0.0);
        assert_eq!(SignalPattern::cortical().description(), "Cortical rhythms");
    }
}
