use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SeriesPoint, ValueFormat,
};
use lesson_math::OptionContract;
use series_generator::linspace;

use crate::series;

pub const ID: &str = "options-pricing";

const PAYOFF_POINTS: usize = 101;
const DECAY_POINTS: usize = 60;

/// Black-Scholes pricing of a European call and put.
pub struct OptionsPricingEngine;

impl OptionsPricingEngine {
    fn contract(params: &ParameterSet) -> Result<OptionContract, LessonError> {
        Ok(OptionContract::new(
            params.require_number("spot")?,
            params.require_number("strike")?,
            params.require_number("rate")?,
            params.require_number("volatility")?,
            params.require_number("time_to_maturity")?,
        )?)
    }
}

impl LessonEngine for OptionsPricingEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let contract = Self::contract(params)?;
        let call = contract.call_price();
        let put = contract.put_price();
        let greeks = contract.greeks();
        let forward_strike = contract.strike * (-contract.rate * contract.time_to_maturity.max(0.0)).exp();

        let mut result = CalculationResult::new();
        result
            .set_number("call_price", call)
            .set_number("put_price", put)
            .set_number("intrinsic_value", contract.intrinsic_call())
            .set_number("time_value", contract.time_value_call())
            .set_number("parity_gap", call - put - (contract.spot - forward_strike))
            .set_text("moneyness", contract.moneyness().label())
            .set_record(
                "greeks",
                &[
                    ("delta_call", greeks.delta_call),
                    ("delta_put", greeks.delta_put),
                    ("gamma", greeks.gamma),
                    ("vega", greeks.vega),
                    ("theta_call", greeks.theta_call),
                    ("theta_put", greeks.theta_put),
                    ("rho_call", greeks.rho_call),
                    ("rho_put", greeks.rho_put),
                ],
            );
        if let Some((d1, d2)) = contract.d1_d2() {
            result.set_number("d1", d1).set_number("d2", d2);
        }
        Ok(result)
    }

    fn generate(&self, params: &ParameterSet, _result: &CalculationResult, _seed: u64) -> Result<ChartData, LessonError> {
        let contract = Self::contract(params)?;
        let mut chart = ChartData::new();

        chart.insert(series(
            "payoff",
            linspace(0.5 * contract.strike, 1.5 * contract.strike, PAYOFF_POINTS)
                .into_iter()
                .map(|spot| {
                    let at = contract.with_spot(spot);
                    SeriesPoint::new(spot, at.call_price())
                        .with("put", at.put_price())
                        .with("intrinsic", at.intrinsic_call())
                }),
        ));

        // Elapsed time on the axis, so the value decays left to right.
        let horizon = contract.time_to_maturity.max(0.0);
        let points = if horizon > 0.0 { DECAY_POINTS } else { 1 };
        chart.insert(series(
            "time_decay",
            linspace(0.0, horizon, points).into_iter().map(|elapsed| {
                let at = contract.with_time(horizon - elapsed);
                SeriesPoint::new(elapsed, at.call_price()).with("put", at.put_price())
            }),
        ));

        Ok(chart)
    }

    fn is_valid(&self, params: &ParameterSet, result: &CalculationResult) -> bool {
        let (Some(call), Some(put), Some(gap), Some(spot)) = (
            result.number("call_price"),
            result.number("put_price"),
            result.number("parity_gap"),
            params.number("spot"),
        ) else {
            return false;
        };
        call >= 0.0 && put >= 0.0 && gap.abs() <= 1e-6 * spot.max(1.0)
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Pricing Options with Black-Scholes", "derivatives", Difficulty::Intermediate)
        .with_description(
            "Price European calls and puts in closed form and watch how spot, volatility and time move the value.",
        )
        .with_topics(&["options", "black-scholes", "greeks", "volatility"])
        .with_estimated_minutes(25);

    let schema = vec![
        Parameter::slider("spot", "Spot Price", 50.0, 150.0, 1.0, 100.0)
            .with_format(ValueFormat::Currency { decimals: 2 })
            .with_category("contract"),
        Parameter::slider("strike", "Strike Price", 50.0, 150.0, 1.0, 100.0)
            .with_format(ValueFormat::Currency { decimals: 2 })
            .with_category("contract"),
        Parameter::slider("time_to_maturity", "Time to Expiry", 0.0, 2.0, 0.05, 1.0)
            .with_format(ValueFormat::Years { decimals: 2 })
            .with_category("contract"),
        Parameter::slider("volatility", "Volatility", 0.05, 1.0, 0.01, 0.2)
            .with_format(ValueFormat::Ratio { decimals: 0 })
            .with_category("market"),
        Parameter::slider("rate", "Risk-Free Rate", 0.0, 0.15, 0.005, 0.05)
            .with_format(ValueFormat::Ratio { decimals: 1 })
            .with_category("market")
            .with_importance(Importance::Secondary),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "What an Option Is Worth",
            "A call gives the right, not the obligation, to buy at the strike. Its value today is the \
             discounted expected payoff under a lognormal model of the underlying.",
        ),
        PhaseDescriptor::formula(
            "formula",
            "The Black-Scholes Formula",
            "C = S N(d1) - K e^(-rT) N(d2)",
            "d1 = [ln(S/K) + (r + sigma^2/2) T] / (sigma sqrt(T)), d2 = d1 - sigma sqrt(T)",
        ),
        PhaseDescriptor::explorer(
            "explore",
            "Move the Inputs",
            &["spot", "strike", "time_to_maturity", "volatility", "rate"],
        ),
        PhaseDescriptor::chart(
            "payoff",
            "Price Against Spot",
            &["payoff"],
            Some("Before expiry the curve sits above the hockey-stick payoff; the gap is time value."),
        ),
        PhaseDescriptor::chart("decay", "Time Decay", &["time_decay"], None)
            .with_description("Holding everything else fixed, the option converges to intrinsic value at expiry."),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![
                QuizQuestion::new(
                    "What is a call worth at expiry when S = 120 and K = 100?",
                    &["0", "20", "It depends on volatility"],
                    1,
                ),
                QuizQuestion::new(
                    "Raising volatility does what to a call's price?",
                    &["Raises it", "Lowers it", "Nothing"],
                    0,
                ),
            ],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "Option value is intrinsic value plus time value.",
                "Volatility and time both add optionality.",
                "Calls and puts are tied together by put-call parity.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(OptionsPricingEngine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn defaults() -> ParameterSet {
        module().default_parameters
    }

    #[test]
    fn test_default_prices() {
        let result = OptionsPricingEngine.calculate(&defaults()).unwrap();
        assert_relative_eq!(result.number("call_price").unwrap(), 10.4506, epsilon = 1e-3);
        assert_relative_eq!(result.number("put_price").unwrap(), 5.5735, epsilon = 1e-3);
        assert_eq!(result.text("moneyness"), Some("at the money"));
        assert!(result.record("greeks").unwrap()["gamma"] > 0.0);
    }

    #[test]
    fn test_expiry_has_single_decay_point() {
        let params = defaults().with("time_to_maturity", 0.0).with("spot", 120.0);
        let result = OptionsPricingEngine.calculate(&params).unwrap();
        assert_eq!(result.number("call_price"), Some(20.0));
        assert!(result.number("d1").is_none());

        let chart = OptionsPricingEngine.generate(&params, &result, 1).unwrap();
        assert_eq!(chart.get("time_decay").unwrap().len(), 1);
        assert!(chart.check().is_ok());
    }

    #[test]
    fn test_payoff_curve_is_monotone() {
        let params = defaults();
        let result = OptionsPricingEngine.calculate(&params).unwrap();
        let chart = OptionsPricingEngine.generate(&params, &result, 0).unwrap();
        let values = chart.get("payoff").unwrap().values();
        assert_eq!(values.len(), PAYOFF_POINTS);
        assert!(values.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_missing_parameter_is_reported() {
        let err = OptionsPricingEngine.calculate(&ParameterSet::new()).unwrap_err();
        assert!(matches!(err, LessonError::MissingParameter(ref k) if k == "spot"));
    }

    #[test]
    fn test_parity_holds_across_grid() {
        for spot in [60.0, 95.0, 100.0, 140.0] {
            for vol in [0.05, 0.4, 1.0] {
                let params = defaults().with("spot", spot).with("volatility", vol);
                let result = OptionsPricingEngine.calculate(&params).unwrap();
                assert!(OptionsPricingEngine.is_valid(&params, &result));
            }
        }
    }
}
