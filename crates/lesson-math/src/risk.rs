use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::normal::{normal_pdf, z_for_confidence};

/// Trading days used to scale annualized figures to one day.
pub const TRADING_DAYS: f64 = 252.0;

/// Inputs for a parametric (variance-covariance) tail-risk estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailRiskInputs {
    pub portfolio_value: f64,
    /// Annualized expected return as a fraction (0.08 = 8%).
    pub annual_return: f64,
    /// Annualized volatility as a fraction.
    pub annual_volatility: f64,
    /// One-sided confidence level, e.g. 0.95.
    pub confidence: f64,
    pub horizon_days: f64,
}

/// Value-at-Risk and Expected Shortfall, as fractions of portfolio value
/// and in currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailRisk {
    pub z_score: f64,
    pub daily_return: f64,
    pub daily_volatility: f64,
    pub horizon_return: f64,
    pub horizon_volatility: f64,
    pub var: f64,
    pub expected_shortfall: f64,
    pub var_amount: f64,
    pub expected_shortfall_amount: f64,
}

impl TailRisk {
    /// How much worse the average tail loss is than the VaR threshold.
    pub fn shortfall_ratio(&self) -> Option<f64> {
        (self.var.abs() > f64::EPSILON).then(|| self.expected_shortfall / self.var)
    }
}

/// Scale an annualized figure to one trading day (divide by sqrt(252)).
pub fn daily_scale(annual: f64) -> f64 {
    annual / TRADING_DAYS.sqrt()
}

/// Parametric VaR for one period: -(mu - z sigma).
pub fn value_at_risk(mean: f64, volatility: f64, z: f64) -> f64 {
    -(mean - z * volatility)
}

/// Parametric ES for one period: -(mu - sigma phi(z) / alpha), alpha = 1 - confidence.
pub fn expected_shortfall(mean: f64, volatility: f64, z: f64, confidence: f64) -> f64 {
    let alpha = 1.0 - confidence;
    -(mean - volatility * normal_pdf(z) / alpha)
}

pub fn tail_risk(inputs: &TailRiskInputs) -> Result<TailRisk> {
    if !(inputs.confidence > 0.5 && inputs.confidence < 1.0) {
        bail!("confidence must be between 0.5 and 1");
    }
    if inputs.annual_volatility < 0.0 {
        bail!("volatility cannot be negative");
    }
    if inputs.horizon_days < 1.0 {
        bail!("horizon must be at least one day");
    }
    if inputs.portfolio_value < 0.0 {
        bail!("portfolio value cannot be negative");
    }

    let z = z_for_confidence(inputs.confidence);
    let daily_return = daily_scale(inputs.annual_return);
    let daily_volatility = daily_scale(inputs.annual_volatility);
    let horizon_return = daily_return * inputs.horizon_days;
    let horizon_volatility = daily_volatility * inputs.horizon_days.sqrt();

    let var = value_at_risk(horizon_return, horizon_volatility, z);
    let es = expected_shortfall(horizon_return, horizon_volatility, z, inputs.confidence);

    Ok(TailRisk {
        z_score: z,
        daily_return,
        daily_volatility,
        horizon_return,
        horizon_volatility,
        var,
        expected_shortfall: es,
        var_amount: var * inputs.portfolio_value,
        expected_shortfall_amount: es * inputs.portfolio_value,
    })
}

/// Empirical VaR from a sample of returns: the loss at the (1 - confidence)
/// quantile.
pub fn historical_var(returns: &[f64], confidence: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = ((1.0 - confidence) * sorted.len() as f64) as usize;
    sorted.get(index.min(sorted.len() - 1)).map(|r| -r)
}

/// Empirical ES: average loss over the worst (1 - confidence) share of returns.
pub fn historical_expected_shortfall(returns: &[f64], confidence: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let cutoff = (((1.0 - confidence) * sorted.len() as f64).ceil() as usize).max(1);
    let tail = &sorted[..cutoff.min(sorted.len())];
    Some(-(tail.iter().sum::<f64>() / tail.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inputs(confidence: f64) -> TailRiskInputs {
        TailRiskInputs {
            portfolio_value: 1_000_000.0,
            annual_return: 0.08,
            annual_volatility: 0.2,
            confidence,
            horizon_days: 1.0,
        }
    }

    #[test]
    fn test_95_percent_uses_tabulated_z() {
        let r = tail_risk(&inputs(0.95)).unwrap();
        assert_eq!(r.z_score, 1.645);
        let sigma = 0.2 / 252f64.sqrt();
        let mu = 0.08 / 252f64.sqrt();
        assert_relative_eq!(r.daily_volatility, sigma, epsilon = 1e-15);
        assert_relative_eq!(r.var, -(mu - 1.645 * sigma), epsilon = 1e-12);
        assert_relative_eq!(r.expected_shortfall, -(mu - sigma * 0.10311 / 0.05), epsilon = 1e-5);
        assert_relative_eq!(r.var_amount, r.var * 1_000_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shortfall_never_below_var() {
        for confidence in [0.8, 0.9, 0.925, 0.95, 0.975, 0.99, 0.995, 0.999] {
            for vol in [0.0, 0.01, 0.1, 0.35, 0.8] {
                for ret in [-0.5, -0.1, 0.0, 0.08, 0.4, 2.0] {
                    for horizon in [1.0, 10.0, 250.0] {
                        let r = tail_risk(&TailRiskInputs {
                            portfolio_value: 50_000.0,
                            annual_return: ret,
                            annual_volatility: vol,
                            confidence,
                            horizon_days: horizon,
                        })
                        .unwrap();
                        assert!(
                            r.expected_shortfall >= r.var,
                            "ES {} < VaR {} at c={confidence} vol={vol} ret={ret}",
                            r.expected_shortfall,
                            r.var
                        );
                        assert!(r.expected_shortfall_amount >= r.var_amount);
                    }
                }
            }
        }
    }

    #[test]
    fn test_horizon_scaling() {
        let one = tail_risk(&inputs(0.99)).unwrap();
        let ten = tail_risk(&TailRiskInputs { horizon_days: 10.0, ..inputs(0.99) }).unwrap();
        assert_relative_eq!(ten.horizon_volatility, one.horizon_volatility * 10f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(ten.horizon_return, one.horizon_return * 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(tail_risk(&inputs(1.0)).is_err());
        assert!(tail_risk(&TailRiskInputs { annual_volatility: -0.1, ..inputs(0.95) }).is_err());
        assert!(tail_risk(&TailRiskInputs { horizon_days: 0.0, ..inputs(0.95) }).is_err());
    }

    #[test]
    fn test_historical_measures() {
        let returns: Vec<f64> = (1..=100).map(|i| (i as f64 - 50.0) / 1000.0).collect();
        let var = historical_var(&returns, 0.95).unwrap();
        let es = historical_expected_shortfall(&returns, 0.95).unwrap();
        assert_relative_eq!(var, 0.044, epsilon = 1e-12);
        assert!(es >= var);
        assert!(historical_var(&[], 0.95).is_none());
    }
}
