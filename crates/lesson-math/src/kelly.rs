use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Floor applied to log arguments in the growth formula. Keeps the result
/// finite (about -23 per unit weight) when a bet size would wipe out the
/// bankroll.
pub const LOG_EPSILON: f64 = 1e-10;

/// Optimal bet fraction for a binary bet.
///
/// f* = p - (1 - p) / b, where p is the win probability and b the amount won
/// per unit staked. Negative-edge bets return 0; the fraction never exceeds 1.
pub fn kelly_fraction(win_probability: f64, payoff_ratio: f64) -> f64 {
    if payoff_ratio <= 0.0 || !payoff_ratio.is_finite() || !win_probability.is_finite() {
        return 0.0;
    }
    let p = win_probability.clamp(0.0, 1.0);
    (p - (1.0 - p) / payoff_ratio).clamp(0.0, 1.0)
}

/// Expected log growth per bet when staking `fraction` of the bankroll.
///
/// g(f) = p ln(1 + f b) + (1 - p) ln(1 - f)
pub fn growth_rate(fraction: f64, win_probability: f64, payoff_ratio: f64) -> f64 {
    let p = win_probability.clamp(0.0, 1.0);
    let win = (1.0 + fraction * payoff_ratio).max(LOG_EPSILON);
    let loss = (1.0 - fraction).max(LOG_EPSILON);
    p * win.ln() + (1.0 - p) * loss.ln()
}

/// Expected arithmetic return per unit staked: p b - (1 - p).
pub fn edge(win_probability: f64, payoff_ratio: f64) -> f64 {
    win_probability * payoff_ratio - (1.0 - win_probability)
}

/// Full sizing picture for one bet specification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellyAnalysis {
    pub kelly_fraction: f64,
    /// Kelly fraction scaled by the multiplier, capped at 1.
    pub fractional_kelly: f64,
    pub edge: f64,
    pub growth_full: f64,
    pub growth_fractional: f64,
    pub growth_double: f64,
    /// Expected number of bets to double the bankroll at full Kelly.
    pub bets_to_double: Option<f64>,
}

pub fn analyze(win_probability: f64, payoff_ratio: f64, multiplier: f64) -> Result<KellyAnalysis> {
    if !(0.0..=1.0).contains(&win_probability) {
        bail!("win probability must be between 0 and 1");
    }
    if payoff_ratio <= 0.0 || !payoff_ratio.is_finite() {
        bail!("payoff ratio must be positive");
    }
    if multiplier < 0.0 || !multiplier.is_finite() {
        bail!("Kelly multiplier cannot be negative");
    }

    let f = kelly_fraction(win_probability, payoff_ratio);
    let fractional = (f * multiplier).min(1.0);
    let growth_full = growth_rate(f, win_probability, payoff_ratio);

    Ok(KellyAnalysis {
        kelly_fraction: f,
        fractional_kelly: fractional,
        edge: edge(win_probability, payoff_ratio),
        growth_full,
        growth_fractional: growth_rate(fractional, win_probability, payoff_ratio),
        growth_double: growth_rate((2.0 * f).min(1.0), win_probability, payoff_ratio),
        bets_to_double: (growth_full > 0.0).then(|| std::f64::consts::LN_2 / growth_full),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kelly_positive_edge() {
        // 60% win rate, 2:1 payoff -> 0.6 - 0.4 / 2 = 0.4
        assert_relative_eq!(kelly_fraction(0.6, 2.0), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_kelly_no_edge_is_zero() {
        assert_eq!(kelly_fraction(0.5, 1.0), 0.0);
        assert_eq!(kelly_fraction(0.3, 1.0), 0.0);
        assert_eq!(kelly_fraction(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_kelly_always_within_unit_interval() {
        for pi in 0..=100 {
            let p = pi as f64 / 100.0;
            for b in [0.01, 0.1, 0.5, 1.0, 2.0, 10.0, 1e6] {
                let f = kelly_fraction(p, b);
                assert!((0.0..=1.0).contains(&f), "f*={f} for p={p}, b={b}");
            }
        }
        assert_eq!(kelly_fraction(1.0, 3.0), 1.0);
        assert_eq!(kelly_fraction(0.7, 0.0), 0.0);
    }

    #[test]
    fn test_growth_is_finite_when_bankroll_is_wiped_out() {
        let g = growth_rate(1.0, 0.6, 2.0);
        assert!(g.is_finite());
        // 0.6 ln 3 + 0.4 ln 1e-10
        assert_relative_eq!(g, 0.6 * 3.0f64.ln() + 0.4 * LOG_EPSILON.ln(), epsilon = 1e-12);
        assert!(growth_rate(1.5, 0.6, 2.0).is_finite());
        assert!(growth_rate(-2.0, 0.6, 0.5).is_finite());
    }

    #[test]
    fn test_full_kelly_maximizes_growth() {
        let f = kelly_fraction(0.55, 1.5);
        let best = growth_rate(f, 0.55, 1.5);
        for delta in [-0.1, -0.05, 0.05, 0.1] {
            assert!(growth_rate(f + delta, 0.55, 1.5) < best);
        }
    }

    #[test]
    fn test_analysis_fields() {
        let a = analyze(0.6, 2.0, 0.5).unwrap();
        assert_relative_eq!(a.fractional_kelly, 0.2, epsilon = 1e-12);
        assert_relative_eq!(a.edge, 0.8, epsilon = 1e-12);
        assert!(a.growth_full > a.growth_fractional);
        assert!(a.growth_double < a.growth_full);
        assert!(a.bets_to_double.unwrap() > 0.0);

        let none = analyze(0.4, 1.0, 1.0).unwrap();
        assert_eq!(none.kelly_fraction, 0.0);
        assert!(none.bets_to_double.is_none());
    }

    #[test]
    fn test_analysis_rejects_bad_inputs() {
        assert!(analyze(1.2, 2.0, 1.0).is_err());
        assert!(analyze(0.6, 0.0, 1.0).is_err());
        assert!(analyze(0.6, 2.0, -1.0).is_err());
    }
}
