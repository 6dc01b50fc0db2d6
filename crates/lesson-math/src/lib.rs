//! Closed-form and numeric building blocks used by the lesson engines.
//!
//! Every function here is pure: identical inputs give identical outputs and
//! nothing is cached or mutated.

pub mod kelly;
pub mod normal;
pub mod options;
pub mod risk;
pub mod spectral;
pub mod vwap;

pub use kelly::{analyze as analyze_kelly, edge, growth_rate, kelly_fraction, KellyAnalysis};
pub use normal::{erf, inverse_normal_cdf, normal_cdf, normal_pdf, z_for_confidence};
pub use options::{Greeks, Moneyness, OptionContract};
pub use risk::{tail_risk, TailRisk, TailRiskInputs, TRADING_DAYS};
pub use spectral::{dft, FrequencyBin, FrequencyGrid, Spectrum};
pub use vwap::{bucketed_vwap, cumulative_vwap, slippage_bps, vwap_bands, Print, VwapBand};
