use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::rng::SeededRng;

/// Longest path any lesson may request.
pub const MAX_STEPS: usize = 2_000;

/// Steps between switches for [`Regime::Mixed`].
pub const MIXED_CADENCE: usize = 20;

/// Behavioral preset for synthetic price paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Persistent direction, weak pull toward the base price
    Trending,

    /// Noisy, strongly mean reverting
    Choppy,

    /// Alternates trending and choppy every [`MIXED_CADENCE`] steps
    Mixed,
}

impl Regime {
    pub fn name(&self) -> &'static str {
        match self {
            Regime::Trending => "trending",
            Regime::Choppy => "choppy",
            Regime::Mixed => "mixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trending" => Some(Regime::Trending),
            "choppy" => Some(Regime::Choppy),
            "mixed" => Some(Regime::Mixed),
            _ => None,
        }
    }

    /// The concrete rule in force at `step`.
    pub fn active_at(&self, step: usize) -> Regime {
        match self {
            Regime::Mixed if (step / MIXED_CADENCE) % 2 == 0 => Regime::Trending,
            Regime::Mixed => Regime::Choppy,
            other => *other,
        }
    }

    pub fn weights(&self) -> RegimeWeights {
        match self {
            Regime::Trending => RegimeWeights {
                trend: 0.8,
                mean_reversion: 0.01,
                noise: 0.5,
                momentum_decay: 0.95,
            },
            Regime::Choppy => RegimeWeights {
                trend: 0.1,
                mean_reversion: 0.15,
                noise: 1.2,
                momentum_decay: 0.5,
            },
            // Never asked for directly; mixed resolves through `active_at`.
            Regime::Mixed => Regime::Trending.weights(),
        }
    }
}

/// Relative strength of each price component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeights {
    pub trend: f64,
    pub mean_reversion: f64,
    pub noise: f64,
    /// Fraction of the previous momentum carried into the next step.
    pub momentum_decay: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPathConfig {
    pub base_price: f64,
    /// Per-step volatility as a fraction of price.
    pub volatility: f64,
    pub steps: usize,
    pub regime: Regime,
}

impl MarketPathConfig {
    pub fn new(base_price: f64, volatility: f64, steps: usize, regime: Regime) -> Result<Self> {
        if !(base_price.is_finite() && base_price > 0.0) {
            bail!("base price must be positive");
        }
        if !(volatility.is_finite() && volatility >= 0.0) {
            bail!("volatility cannot be negative");
        }
        if steps == 0 {
            bail!("path needs at least one step");
        }
        if steps > MAX_STEPS {
            tracing::debug!(requested = steps, max = MAX_STEPS, "capping market path length");
        }
        Ok(Self {
            base_price,
            volatility,
            steps: steps.min(MAX_STEPS),
            regime,
        })
    }

    pub fn floor(&self) -> f64 {
        0.7 * self.base_price
    }

    pub fn ceiling(&self) -> f64 {
        1.3 * self.base_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketStep {
    pub price: f64,
    /// Signed return from the previous step.
    pub change: f64,
    pub momentum: f64,
    pub regime: Regime,
}

/// Simulate a clamped price path.
///
/// Each step draws exactly two gaussians, the momentum shock first and the
/// noise second, so paths stay reproducible across regimes.
pub fn simulate_path(config: &MarketPathConfig, rng: &mut SeededRng) -> Vec<MarketStep> {
    let base = config.base_price;
    let mut price = base;
    let mut momentum = 0.0;
    let mut path = Vec::with_capacity(config.steps);

    for step in 0..config.steps {
        let active = config.regime.active_at(step);
        let w = active.weights();

        let shock = rng.next_gaussian();
        let noise_draw = rng.next_gaussian();

        momentum = w.momentum_decay * momentum + (1.0 - w.momentum_decay) * shock;
        let trend = w.trend * momentum * config.volatility * price;
        let reversion = -w.mean_reversion * (price - base);
        let noise = w.noise * config.volatility * price * noise_draw;

        let previous = price;
        price = (price + trend + reversion + noise).clamp(config.floor(), config.ceiling());

        path.push(MarketStep {
            price,
            change: price / previous - 1.0,
            momentum,
            regime: active,
        });
    }
    path
}

/// Average absolute step return, the realized volatility of a path.
pub fn realized_volatility(path: &[MarketStep]) -> f64 {
    if path.is_empty() {
        return 0.0;
    }
    path.iter().map(|s| s.change.abs()).sum::<f64>() / path.len() as f64
}

/// Share of a path's absolute move that survived as net displacement.
///
/// 1.0 for a straight line, near 0 for a path that goes nowhere.
pub fn path_efficiency(start: f64, path: &[MarketStep]) -> f64 {
    let Some(last) = path.last() else {
        return 0.0;
    };
    let mut travelled = 0.0;
    let mut previous = start;
    for step in path {
        travelled += (step.price - previous).abs();
        previous = step.price;
    }
    if travelled <= 0.0 {
        return 0.0;
    }
    (last.price - start).abs() / travelled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(regime: Regime) -> MarketPathConfig {
        MarketPathConfig::new(100.0, 0.02, 400, regime).unwrap()
    }

    #[test]
    fn test_path_is_reproducible() {
        let a = simulate_path(&config(Regime::Mixed), &mut SeededRng::new(42));
        let b = simulate_path(&config(Regime::Mixed), &mut SeededRng::new(42));
        assert_eq!(a, b);

        let c = simulate_path(&config(Regime::Mixed), &mut SeededRng::new(43));
        assert_ne!(a, c);
    }

    #[test]
    fn test_prices_stay_within_clamp() {
        for regime in [Regime::Trending, Regime::Choppy, Regime::Mixed] {
            let cfg = MarketPathConfig::new(50.0, 0.2, 1_000, regime).unwrap();
            for step in simulate_path(&cfg, &mut SeededRng::new(5)) {
                assert!(
                    step.price >= cfg.floor() && step.price <= cfg.ceiling(),
                    "{regime:?} escaped: {}",
                    step.price
                );
            }
        }
    }

    #[test]
    fn test_mixed_alternates_at_cadence() {
        let path = simulate_path(&config(Regime::Mixed), &mut SeededRng::new(1));
        assert_eq!(path[0].regime, Regime::Trending);
        assert_eq!(path[MIXED_CADENCE - 1].regime, Regime::Trending);
        assert_eq!(path[MIXED_CADENCE].regime, Regime::Choppy);
        assert_eq!(path[2 * MIXED_CADENCE].regime, Regime::Trending);
    }

    #[test]
    fn test_zero_volatility_stays_flat() {
        let cfg = MarketPathConfig::new(100.0, 0.0, 50, Regime::Trending).unwrap();
        assert!(simulate_path(&cfg, &mut SeededRng::new(9)).iter().all(|s| s.price == 100.0));
    }

    #[test]
    fn test_steps_are_capped() {
        let cfg = MarketPathConfig::new(100.0, 0.01, MAX_STEPS * 3, Regime::Choppy).unwrap();
        assert_eq!(cfg.steps, MAX_STEPS);
        assert!(MarketPathConfig::new(100.0, 0.01, 0, Regime::Choppy).is_err());
        assert!(MarketPathConfig::new(-1.0, 0.01, 10, Regime::Choppy).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Regime::parse(" Trending "), Some(Regime::Trending));
        assert_eq!(Regime::parse("mixed"), Some(Regime::Mixed));
        assert_eq!(Regime::parse("sideways"), None);
    }

    #[test]
    fn test_efficiency_bounds() {
        let path = simulate_path(&config(Regime::Choppy), &mut SeededRng::new(3));
        let e = path_efficiency(100.0, &path);
        assert!((0.0..=1.0).contains(&e));
        assert_eq!(path_efficiency(100.0, &[]), 0.0);
    }
}
