use serde::{Deserialize, Serialize};

use crate::rng::SeededRng;

/// Intraday volume profile as a function of the session fraction elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumePattern {
    /// Heavy at the open and close, light at midday
    UShaped,

    /// Front-loaded, tapering through the session
    Declining,

    /// No shape, uniform jitter
    Random,

    /// Quiet session with a burst at midday
    Spike,
}

impl VolumePattern {
    pub fn name(&self) -> &'static str {
        match self {
            VolumePattern::UShaped => "u-shaped",
            VolumePattern::Declining => "declining",
            VolumePattern::Random => "random",
            VolumePattern::Spike => "spike",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "u-shaped" | "u_shaped" | "ushaped" => Some(VolumePattern::UShaped),
            "declining" => Some(VolumePattern::Declining),
            "random" => Some(VolumePattern::Random),
            "spike" => Some(VolumePattern::Spike),
            _ => None,
        }
    }

    /// Pattern multiplier at `fraction` (0 = open, 1 = close).
    ///
    /// Only [`VolumePattern::Random`] consumes a draw.
    pub fn multiplier(&self, fraction: f64, rng: &mut SeededRng) -> f64 {
        match self {
            VolumePattern::Random => 0.5 + rng.next_f64(),
            _ => self.expected_multiplier(fraction),
        }
    }

    /// Mean of [`multiplier`](Self::multiplier) at `fraction`, without drawing.
    pub fn expected_multiplier(&self, fraction: f64) -> f64 {
        let x = fraction.clamp(0.0, 1.0);
        match self {
            VolumePattern::UShaped => 1.0 + 2.0 * (2.0 * x - 1.0).powi(2),
            VolumePattern::Declining => 2.5 - 2.0 * x,
            VolumePattern::Random => 1.0,
            VolumePattern::Spike => 1.0 + 3.0 * (-((x - 0.5) / 0.05).powi(2)).exp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub base_volume: f64,
    pub pattern: VolumePattern,
    /// Extra volume per 1% absolute price move.
    pub volatility_sensitivity: f64,
    pub min_volume: f64,
}

impl VolumeConfig {
    pub fn new(base_volume: f64, pattern: VolumePattern) -> Self {
        Self {
            base_volume,
            pattern,
            volatility_sensitivity: 0.5,
            min_volume: 100.0,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.volatility_sensitivity = sensitivity.max(0.0);
        self
    }

    pub fn with_min_volume(mut self, min_volume: f64) -> Self {
        self.min_volume = min_volume.max(0.0);
        self
    }
}

/// One volume per price, shaped by session time and price activity.
///
/// Draw order per step: base jitter, then the pattern draw (random only).
pub fn shape_volume(config: &VolumeConfig, prices: &[f64], rng: &mut SeededRng) -> Vec<f64> {
    let n = prices.len();
    let span = n.saturating_sub(1).max(1) as f64;

    (0..n)
        .map(|i| {
            let fraction = i as f64 / span;
            let stochastic = config.base_volume * (0.75 + 0.5 * rng.next_f64());
            let pattern = config.pattern.multiplier(fraction, rng);

            let move_pct = if i > 0 && prices[i - 1] > 0.0 {
                (prices[i] / prices[i - 1] - 1.0).abs() * 100.0
            } else {
                0.0
            };
            let response = 1.0 + config.volatility_sensitivity * move_pct;

            (stochastic * pattern * response).max(config.min_volume)
        })
        .collect()
}
