use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::normal::{normal_cdf, normal_pdf};

/// European option on a non-dividend-paying underlying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub spot: f64,
    pub strike: f64,
    /// Continuously compounded risk-free rate (0.05 = 5%).
    pub rate: f64,
    /// Annualized volatility (0.2 = 20%).
    pub volatility: f64,
    /// Years until expiry.
    pub time_to_maturity: f64,
}

/// Sensitivities of the option price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta_call: f64,
    pub delta_put: f64,
    pub gamma: f64,
    /// Price change per 1 volatility point.
    pub vega: f64,
    /// Price change per calendar day.
    pub theta_call: f64,
    pub theta_put: f64,
    /// Price change per 1 rate point.
    pub rho_call: f64,
    pub rho_put: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Moneyness {
    InTheMoney,
    AtTheMoney,
    OutOfTheMoney,
}

impl Moneyness {
    pub fn label(&self) -> &'static str {
        match self {
            Moneyness::InTheMoney => "in the money",
            Moneyness::AtTheMoney => "at the money",
            Moneyness::OutOfTheMoney => "out of the money",
        }
    }
}

impl OptionContract {
    pub fn new(spot: f64, strike: f64, rate: f64, volatility: f64, time_to_maturity: f64) -> Result<Self> {
        if !(spot.is_finite() && strike.is_finite() && rate.is_finite() && volatility.is_finite() && time_to_maturity.is_finite()) {
            bail!("option inputs must be finite");
        }
        if spot <= 0.0 {
            bail!("spot price must be positive");
        }
        if strike <= 0.0 {
            bail!("strike price must be positive");
        }
        if volatility < 0.0 {
            bail!("volatility cannot be negative");
        }
        Ok(Self {
            spot,
            strike,
            rate,
            volatility,
            time_to_maturity,
        })
    }

    /// Same contract with a different spot (used for payoff diagrams).
    pub fn with_spot(&self, spot: f64) -> Self {
        Self { spot, ..*self }
    }

    pub fn with_time(&self, time_to_maturity: f64) -> Self {
        Self {
            time_to_maturity,
            ..*self
        }
    }

    fn has_time_value(&self) -> bool {
        self.time_to_maturity > 0.0 && self.volatility > 0.0
    }

    fn discount(&self) -> f64 {
        (-self.rate * self.time_to_maturity.max(0.0)).exp()
    }

    /// `(d1, d2)`; `None` at expiry or with zero volatility.
    pub fn d1_d2(&self) -> Option<(f64, f64)> {
        if !self.has_time_value() {
            return None;
        }
        let sqrt_t = self.time_to_maturity.sqrt();
        let vol_sqrt_t = self.volatility * sqrt_t;
        let d1 = ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility * self.volatility) * self.time_to_maturity)
            / vol_sqrt_t;
        Some((d1, d1 - vol_sqrt_t))
    }

    pub fn intrinsic_call(&self) -> f64 {
        (self.spot - self.strike).max(0.0)
    }

    pub fn intrinsic_put(&self) -> f64 {
        (self.strike - self.spot).max(0.0)
    }

    /// Black-Scholes call price, floored at zero.
    ///
    /// At or past expiry the price is the intrinsic value exactly.
    pub fn call_price(&self) -> f64 {
        if self.time_to_maturity <= 0.0 {
            return self.intrinsic_call();
        }
        match self.d1_d2() {
            Some((d1, d2)) => {
                (self.spot * normal_cdf(d1) - self.strike * self.discount() * normal_cdf(d2)).max(0.0)
            }
            None => (self.spot - self.strike * self.discount()).max(0.0),
        }
    }

    /// Black-Scholes put price, floored at zero.
    pub fn put_price(&self) -> f64 {
        if self.time_to_maturity <= 0.0 {
            return self.intrinsic_put();
        }
        match self.d1_d2() {
            Some((d1, d2)) => {
                (self.strike * self.discount() * normal_cdf(-d2) - self.spot * normal_cdf(-d1)).max(0.0)
            }
            None => (self.strike * self.discount() - self.spot).max(0.0),
        }
    }

    pub fn time_value_call(&self) -> f64 {
        (self.call_price() - self.intrinsic_call()).max(0.0)
    }

    pub fn moneyness(&self) -> Moneyness {
        let ratio = self.spot / self.strike;
        if (ratio - 1.0).abs() < 0.01 {
            Moneyness::AtTheMoney
        } else if ratio > 1.0 {
            Moneyness::InTheMoney
        } else {
            Moneyness::OutOfTheMoney
        }
    }

    pub fn greeks(&self) -> Greeks {
        let Some((d1, d2)) = self.d1_d2() else {
            let forward_strike = self.strike * self.discount();
            let delta_call = if self.spot > forward_strike { 1.0 } else { 0.0 };
            return Greeks {
                delta_call,
                delta_put: delta_call - 1.0,
                ..Greeks::default()
            };
        };

        let t = self.time_to_maturity;
        let sqrt_t = t.sqrt();
        let discount = self.discount();
        let pdf_d1 = normal_pdf(d1);
        let decay = -(self.spot * pdf_d1 * self.volatility) / (2.0 * sqrt_t);

        Greeks {
            delta_call: normal_cdf(d1),
            delta_put: normal_cdf(d1) - 1.0,
            gamma: pdf_d1 / (self.spot * self.volatility * sqrt_t),
            vega: self.spot * pdf_d1 * sqrt_t / 100.0,
            theta_call: (decay - self.rate * self.strike * discount * normal_cdf(d2)) / 365.0,
            theta_put: (decay + self.rate * self.strike * discount * normal_cdf(-d2)) / 365.0,
            rho_call: self.strike * t * discount * normal_cdf(d2) / 100.0,
            rho_put: -self.strike * t * discount * normal_cdf(-d2) / 100.0,
        }
    }
}
