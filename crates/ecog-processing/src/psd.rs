//! Welch power spectral density estimation
//!
//! Segments of `segment_len` samples overlap by `overlap`, are detrended,
//! tapered and transformed with a real FFT. The one-sided periodograms are
//! scaled to a density (units²/Hz) and averaged, matching the default
//! behaviour of `scipy.signal.welch`.

use crate::config::{Detrend, WelchConfig, WindowFunction};
use ecog_core::{segment_error, EcogError, EcogResult};
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Power spectrum of a multichannel segment
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Frequency of every bin in Hz
    pub freqs: Vec<f64>,
    /// Power per channel and frequency bin
    pub power: Vec<Vec<f64>>,
}

impl Psd {
    pub fn channel_count(&self) -> usize {
        self.power.len()
    }

    /// Channel-major flattening: all bins of channel 0, then channel 1, ...
    pub fn flatten(&self) -> Vec<f64> {
        self.power.iter().flatten().copied().collect()
    }
}

/// Frequencies of a one-sided spectrum of `segment_len` samples at `fs` Hz
pub fn frequencies(segment_len: usize, fs: f64) -> Vec<f64> {
    (0..segment_len / 2 + 1)
        .map(|k| k as f64 * fs / segment_len as f64)
        .collect()
}

/// Window coefficients of length `n`
pub fn window_coefficients(window: WindowFunction, n: usize) -> Vec<f64> {
    match window {
        WindowFunction::Hann if n > 1 => (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
            .collect(),
        _ => vec![1.0; n],
    }
}

fn detrend(segment: &mut [f64], mode: Detrend) {
    let n = segment.len() as f64;
    match mode {
        Detrend::None => {}
        Detrend::Constant => {
            let mean = segment.iter().sum::<f64>() / n;
            segment.iter_mut().for_each(|x| *x -= mean);
        }
        Detrend::Linear => {
            if segment.len() < 2 {
                segment.iter_mut().for_each(|x| *x = 0.0);
                return;
            }
            let t_mean = (n - 1.0) / 2.0;
            let x_mean = segment.iter().sum::<f64>() / n;
            let (mut cov, mut var) = (0.0, 0.0);
            for (i, &x) in segment.iter().enumerate() {
                let dt = i as f64 - t_mean;
                cov += dt * (x - x_mean);
                var += dt * dt;
            }
            let slope = cov / var;
            for (i, x) in segment.iter_mut().enumerate() {
                *x -= x_mean + slope * (i as f64 - t_mean);
            }
        }
    }
}

/// Welch estimator with cached FFT plans
pub struct WelchEstimator {
    config: WelchConfig,
    planner: RealFftPlanner<f64>,
}

impl WelchEstimator {
    pub fn new(config: WelchConfig) -> EcogResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            planner: RealFftPlanner::new(),
        })
    }

    pub fn config(&self) -> &WelchConfig {
        &self.config
    }

    /// Estimate the PSD of every channel in `data` (`[channel][sample]`).
    ///
    /// `sampling_rate` is used for the frequency axis unless the configuration
    /// fixes one.
    pub fn estimate(&mut self, data: &[Vec<f64>], sampling_rate: f64) -> EcogResult<Psd> {
        let fs = self.config.sampling_rate.unwrap_or(sampling_rate);
        if !(fs.is_finite() && fs > 0.0) {
            return Err(EcogError::InvalidSamplingRate { rate: fs });
        }

        let n = match data.first() {
            Some(channel) => channel.len(),
            None => return Err(segment_error!("no channels to estimate")),
        };
        if n == 0 {
            return Err(segment_error!("empty segment"));
        }
        if data.iter().any(|channel| channel.len() != n) {
            return Err(segment_error!("channels have different lengths"));
        }
        if data.iter().flatten().any(|x| !x.is_finite()) {
            return Err(segment_error!("segment contains non-finite samples"));
        }

        let segment_len = self.config.segment_len.min(n);
        let overlap = ((segment_len as f64 * self.config.overlap) as usize).min(segment_len - 1);
        let step = segment_len - overlap;
        let segments = (n - segment_len) / step + 1;

        let window = window_coefficients(self.config.window, segment_len);
        let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());

        let fft = self.planner.plan_fft_forward(segment_len);
        let mut input = fft.make_input_vec();
        let mut spectrum = fft.make_output_vec();
        let bins = spectrum.len();

        let mut power = Vec::with_capacity(data.len());
        for channel in data {
            let mut acc = vec![0.0; bins];
            for s in 0..segments {
                let start = s * step;
                input.copy_from_slice(&channel[start..start + segment_len]);
                detrend(&mut input, self.config.detrend);
                input.iter_mut().zip(&window).for_each(|(x, w)| *x *= w);

                fft.process(&mut input, &mut spectrum)
                    .map_err(|e| segment_error!("FFT failed: {}", e))?;

                for (a, c) in acc.iter_mut().zip(&spectrum) {
                    *a += c.norm_sqr();
                }
            }

            let last_doubled = if segment_len % 2 == 0 { bins - 1 } else { bins };
            for (k, a) in acc.iter_mut().enumerate() {
                let one_sided = if k > 0 && k < last_doubled { 2.0 } else { 1.0 };
                *a *= one_sided * scale / segments as f64;
            }
            power.push(acc);
        }

        Ok(Psd {
            freqs: frequencies(segment_len, fs),
            power,
        })
    }
}
