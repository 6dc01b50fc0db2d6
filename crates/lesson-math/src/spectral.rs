//! Direct (non-fast) discrete Fourier transform over a bounded frequency grid.
//!
//! Each candidate frequency is correlated against the samples by summation,
//! O(samples x bins). Both dimensions are capped so a lesson stays
//! interactive; when samples are dropped the spectrum says so.

use std::f64::consts::PI;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Samples beyond this many are not summed.
pub const MAX_SAMPLES: usize = 512;
/// Upper bound on the number of evaluated frequencies.
pub const MAX_BINS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyGrid {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl FrequencyGrid {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            bail!("frequency grid bounds must be finite");
        }
        if min < 0.0 || max < min {
            bail!("frequency grid needs 0 <= min <= max");
        }
        if step <= 0.0 {
            bail!("frequency step must be positive");
        }
        Ok(Self { min, max, step })
    }

    /// Grid frequencies, at most [`MAX_BINS`] of them.
    pub fn frequencies(&self) -> Vec<f64> {
        let count = (((self.max - self.min) / self.step).floor() as usize + 1).min(MAX_BINS);
        (0..count).map(|i| self.min + i as f64 * self.step).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBin {
    pub frequency: f64,
    pub real: f64,
    pub imaginary: f64,
    /// Single-sided amplitude: a pure sine of amplitude A on the grid reads A.
    pub magnitude: f64,
    /// Radians, in (-pi, pi].
    pub phase: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub bins: Vec<FrequencyBin>,
    pub samples_used: usize,
    /// True when the input had more than [`MAX_SAMPLES`] samples.
    pub truncated: bool,
}

impl Spectrum {
    /// Strongest non-zero frequency.
    pub fn dominant(&self) -> Option<&FrequencyBin> {
        self.bins
            .iter()
            .filter(|b| b.frequency > 0.0)
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }
}

/// Correlate `samples` (taken at `sample_rate` per unit time) against each grid frequency.
pub fn dft(samples: &[f64], sample_rate: f64, grid: &FrequencyGrid) -> Spectrum {
    let used = &samples[..samples.len().min(MAX_SAMPLES)];
    let n = used.len();
    let truncated = samples.len() > MAX_SAMPLES;

    if n == 0 || sample_rate <= 0.0 {
        return Spectrum {
            bins: Vec::new(),
            samples_used: n,
            truncated,
        };
    }

    let bins = grid
        .frequencies()
        .into_iter()
        .map(|frequency| {
            let omega = 2.0 * PI * frequency / sample_rate;
            let (mut real, mut imaginary) = (0.0, 0.0);
            for (i, x) in used.iter().enumerate() {
                let angle = omega * i as f64;
                real += x * angle.cos();
                imaginary -= x * angle.sin();
            }
            let scale = if frequency == 0.0 { 1.0 } else { 2.0 };
            FrequencyBin {
                frequency,
                real,
                imaginary,
                magnitude: scale * (real * real + imaginary * imaginary).sqrt() / n as f64,
                phase: imaginary.atan2(real),
            }
        })
        .collect();

    Spectrum {
        bins,
        samples_used: n,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(n: usize, sample_rate: f64, freq: f64, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_pure_sine_recovers_amplitude_and_phase() {
        let samples = sine(200, 100.0, 5.0, 2.0);
        let grid = FrequencyGrid::new(0.0, 20.0, 0.5).unwrap();
        let spectrum = dft(&samples, 100.0, &grid);

        let peak = spectrum.dominant().unwrap();
        assert_relative_eq!(peak.frequency, 5.0);
        assert_relative_eq!(peak.magnitude, 2.0, epsilon = 1e-9);
        assert_relative_eq!(peak.phase, -PI / 2.0, epsilon = 1e-9);
        assert!(!spectrum.truncated);
    }

    #[test]
    fn test_two_components_separate() {
        let a = sine(400, 100.0, 3.0, 1.0);
        let b = sine(400, 100.0, 12.0, 0.5);
        let samples: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
        let spectrum = dft(&samples, 100.0, &FrequencyGrid::new(0.0, 20.0, 0.25).unwrap());

        let at = |f: f64| {
            spectrum
                .bins
                .iter()
                .find(|b| (b.frequency - f).abs() < 1e-9)
                .unwrap()
                .magnitude
        };
        assert_relative_eq!(at(3.0), 1.0, epsilon = 1e-9);
        assert_relative_eq!(at(12.0), 0.5, epsilon = 1e-9);
        assert!(at(7.0) < 1e-9);
    }

    #[test]
    fn test_constant_signal_sits_at_zero_frequency() {
        let spectrum = dft(&[3.0; 64], 1.0, &FrequencyGrid::new(0.0, 0.25, 0.125).unwrap());
        assert_relative_eq!(spectrum.bins[0].magnitude, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_and_bin_caps() {
        let samples = vec![1.0; MAX_SAMPLES + 100];
        let grid = FrequencyGrid::new(0.0, 10_000.0, 1.0).unwrap();
        assert_eq!(grid.frequencies().len(), MAX_BINS);

        let spectrum = dft(&samples, 1000.0, &grid);
        assert!(spectrum.truncated);
        assert_eq!(spectrum.samples_used, MAX_SAMPLES);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(FrequencyGrid::new(5.0, 1.0, 1.0).is_err());
        assert!(FrequencyGrid::new(0.0, 1.0, 0.0).is_err());
    }
}
