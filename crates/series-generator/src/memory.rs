//! Long-memory paths and their rescaled-range diagnostics.
//!
//! The generator scales independent gaussian increments by `(i + 1)^(H - 0.5)`.
//! This is an approximation: it makes increment size drift with time the way
//! a Hurst exponent suggests, but the increments stay uncorrelated, so the
//! output is not an exact fractional Brownian motion.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::rng::SeededRng;

pub const MAX_MEMORY_STEPS: usize = 2_048;

/// Window sizes used by the R/S estimate.
const RS_WINDOWS: [usize; 6] = [8, 16, 32, 64, 128, 256];

/// Fewest increments the R/S estimate will look at.
pub const MIN_RS_SAMPLES: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPath {
    pub hurst: f64,
    pub increments: Vec<f64>,
    pub levels: Vec<f64>,
}

/// Cumulative path starting at `start` with `steps` scaled increments.
pub fn fractional_memory_path(
    hurst: f64,
    steps: usize,
    volatility: f64,
    start: f64,
    rng: &mut SeededRng,
) -> MemoryPath {
    let hurst = hurst.clamp(0.01, 0.99);
    let steps = steps.min(MAX_MEMORY_STEPS);

    let mut increments = Vec::with_capacity(steps);
    let mut levels = Vec::with_capacity(steps + 1);
    let mut level = start;
    levels.push(level);

    for i in 0..steps {
        let scale = ((i + 1) as f64).powf(hurst - 0.5);
        let inc = volatility * scale * rng.next_gaussian();
        level += inc;
        increments.push(inc);
        levels.push(level);
    }

    MemoryPath {
        hurst,
        increments,
        levels,
    }
}

/// Average R/S over non-overlapping windows of `size`.
fn rescaled_range(increments: &[f64], size: usize) -> Option<f64> {
    let windows = increments.len() / size;
    let mut ratios = Vec::with_capacity(windows);

    for w in 0..windows {
        let sub = &increments[w * size..(w + 1) * size];
        let mean = sub.mean();
        let std_dev = sub.population_std_dev();
        if !(std_dev > 0.0) {
            continue;
        }

        let mut cumulative = 0.0;
        let mut high = f64::NEG_INFINITY;
        let mut low = f64::INFINITY;
        for x in sub {
            cumulative += x - mean;
            high = high.max(cumulative);
            low = low.min(cumulative);
        }
        ratios.push((high - low) / std_dev);
    }

    if ratios.is_empty() {
        return None;
    }
    let avg = ratios.iter().sum::<f64>() / ratios.len() as f64;
    (avg > 0.0).then_some(avg)
}

/// Hurst exponent via rescaled-range analysis: the slope of log(R/S)
/// against log(window size), clamped to `[0, 1]`.
///
/// `None` when there are fewer than [`MIN_RS_SAMPLES`] increments or fewer
/// than two usable window sizes.
pub fn estimate_hurst(increments: &[f64]) -> Option<f64> {
    if increments.len() < MIN_RS_SAMPLES {
        return None;
    }

    let (log_n, log_rs): (Vec<f64>, Vec<f64>) = RS_WINDOWS
        .iter()
        .copied()
        .filter(|&size| size <= increments.len())
        .filter_map(|size| rescaled_range(increments, size).map(|rs| ((size as f64).ln(), rs.ln())))
        .unzip();

    if log_rs.len() < 2 {
        return None;
    }

    let n = log_rs.len() as f64;
    let sum_x: f64 = log_n.iter().sum();
    let sum_y: f64 = log_rs.iter().sum();
    let sum_xy: f64 = log_n.iter().zip(&log_rs).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = log_n.iter().map(|x| x * x).sum();
    let denom = n * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }
    Some(((n * sum_xy - sum_x * sum_y) / denom).clamp(0.0, 1.0))
}

/// Lag-k autocorrelation of a sample.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if values.len() <= lag {
        return 0.0;
    }
    let mean = values.mean();
    let var: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if var == 0.0 {
        return 0.0;
    }
    let cov: f64 = values[lag..]
        .iter()
        .zip(values)
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum();
    cov / var
}
