use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    ParamValue, Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SelectOption, SeriesPoint, ValueFormat,
};
use lesson_math::risk::{historical_expected_shortfall, historical_var, tail_risk, TailRiskInputs};
use series_generator::{histogram, linspace, normal_density, SeededRng};

use crate::series;

pub const ID: &str = "value-at-risk";

const DENSITY_POINTS: usize = 161;
const HISTOGRAM_BINS: usize = 40;
const MAX_SIMULATION_DAYS: usize = 5_000;

/// Parametric Value-at-Risk and Expected Shortfall.
pub struct ValueAtRiskEngine;

fn inputs(params: &ParameterSet) -> Result<TailRiskInputs, LessonError> {
    Ok(TailRiskInputs {
        portfolio_value: params.require_number("portfolio_value")?,
        annual_return: params.require_number("annual_return")?,
        annual_volatility: params.require_number("annual_volatility")?,
        confidence: params.require_number("confidence")?,
        horizon_days: params.require_number("horizon_days")?,
    })
}

impl LessonEngine for ValueAtRiskEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let risk = tail_risk(&inputs(params)?)?;

        let mut result = CalculationResult::new();
        result
            .set_number("z_score", risk.z_score)
            .set_number("daily_return", risk.daily_return)
            .set_number("daily_volatility", risk.daily_volatility)
            .set_number("horizon_return", risk.horizon_return)
            .set_number("horizon_volatility", risk.horizon_volatility)
            .set_number("var", risk.var)
            .set_number("expected_shortfall", risk.expected_shortfall)
            .set_number("var_amount", risk.var_amount)
            .set_number("expected_shortfall_amount", risk.expected_shortfall_amount);
        if let Some(ratio) = risk.shortfall_ratio() {
            result.set_number("shortfall_ratio", ratio);
        }
        Ok(result)
    }

    /// Return density with the tail marked, a simulated sample, and VaR/ES
    /// across confidence levels.
    fn generate(&self, params: &ParameterSet, result: &CalculationResult, seed: u64) -> Result<ChartData, LessonError> {
        let base = inputs(params)?;
        let mean = result.require_number("horizon_return")?;
        let sd = result.require_number("horizon_volatility")?;
        let var = result.require_number("var")?;
        let days = (params.require_number("simulation_days")?.max(1.0) as usize).min(MAX_SIMULATION_DAYS);

        let mut chart = ChartData::new();

        chart.insert(series(
            "return_density",
            normal_density(mean, sd, mean - 4.0 * sd, mean + 4.0 * sd, DENSITY_POINTS)
                .into_iter()
                .map(|(x, density)| {
                    let in_tail = if x <= -var { 1.0 } else { 0.0 };
                    SeriesPoint::new(x, density).with("in_tail", in_tail)
                }),
        ));

        let mut rng = SeededRng::new(seed);
        let sample: Vec<f64> = (0..days).map(|_| rng.next_normal(mean, sd)).collect();
        let hist_var = historical_var(&sample, base.confidence).unwrap_or(0.0);
        let hist_es = historical_expected_shortfall(&sample, base.confidence).unwrap_or(0.0);
        chart.insert(series(
            "simulated_returns",
            histogram(&sample, HISTOGRAM_BINS)
                .into_iter()
                .map(|(x, d)| SeriesPoint::new(x, d).with("historical_var", hist_var).with("historical_es", hist_es)),
        ));

        let mut curve = Vec::new();
        for confidence in linspace(0.80, 0.995, 40) {
            let risk = tail_risk(&TailRiskInputs { confidence, ..base })?;
            curve.push(SeriesPoint::new(confidence, risk.var).with("expected_shortfall", risk.expected_shortfall));
        }
        chart.insert(series("confidence_curve", curve));

        Ok(chart)
    }

    fn is_valid(&self, _params: &ParameterSet, result: &CalculationResult) -> bool {
        match (result.number("var"), result.number("expected_shortfall")) {
            (Some(var), Some(es)) => var.is_finite() && es.is_finite() && es >= var,
            _ => false,
        }
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Value at Risk and Expected Shortfall", "risk-management", Difficulty::Intermediate)
        .with_description("Measure how much a portfolio can lose on a bad day, and how bad the bad days really are.")
        .with_topics(&["var", "expected-shortfall", "tail-risk", "normal-distribution"])
        .with_estimated_minutes(20);

    let confidence_levels = vec![
        SelectOption::number(0.90, "90%"),
        SelectOption::number(0.95, "95%"),
        SelectOption::number(0.975, "97.5%"),
        SelectOption::number(0.99, "99%"),
        SelectOption::number(0.995, "99.5%"),
    ];

    let schema = vec![
        Parameter::input("portfolio_value", "Portfolio Value", 1_000.0, 100_000_000.0, 1_000.0, 1_000_000.0)
            .with_format(ValueFormat::Currency { decimals: 0 })
            .with_category("portfolio"),
        Parameter::slider("annual_return", "Expected Annual Return", -0.5, 0.5, 0.01, 0.08)
            .with_format(ValueFormat::Ratio { decimals: 1 })
            .with_category("portfolio"),
        Parameter::slider("annual_volatility", "Annual Volatility", 0.01, 1.0, 0.01, 0.2)
            .with_format(ValueFormat::Ratio { decimals: 1 })
            .with_category("portfolio"),
        Parameter::select("confidence", "Confidence Level", confidence_levels, ParamValue::from(0.95))
            .with_format(ValueFormat::Ratio { decimals: 1 })
            .with_category("risk"),
        Parameter::slider("horizon_days", "Holding Period", 1.0, 250.0, 1.0, 1.0)
            .with_unit("days")
            .with_format(ValueFormat::Integer)
            .with_category("risk")
            .with_importance(Importance::Secondary),
        Parameter::slider("simulation_days", "Simulated Days", 100.0, 2_000.0, 100.0, 500.0)
            .with_format(ValueFormat::Integer)
            .with_category("simulation")
            .with_importance(Importance::Advanced),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "A Line in the Tail",
            "Value at Risk answers one question: at a given confidence, what loss should we not exceed \
             over the holding period? Expected Shortfall asks what we lose on average once we do.",
        ),
        PhaseDescriptor::formula(
            "var",
            "Parametric VaR",
            "VaR = -(mu - z sigma)",
            "mu and sigma are the holding-period mean and volatility; z comes from the confidence level.",
        ),
        PhaseDescriptor::formula(
            "es",
            "Expected Shortfall",
            "ES = -(mu - sigma phi(z) / alpha)",
            "phi is the standard normal density and alpha = 1 - confidence.",
        ),
        PhaseDescriptor::explorer(
            "explore",
            "Stress the Portfolio",
            &["annual_volatility", "confidence", "horizon_days", "annual_return"],
        ),
        PhaseDescriptor::chart(
            "density",
            "Where the Tail Starts",
            &["return_density"],
            Some("Shaded returns fall beyond the VaR threshold."),
        ),
        PhaseDescriptor::chart("curve", "Raising the Confidence", &["confidence_curve"], None),
        PhaseDescriptor::chart("simulation", "A Simulated History", &["simulated_returns"], None),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![QuizQuestion::new(
                "Which is never smaller for the same inputs?",
                &["VaR", "Expected Shortfall", "They can go either way"],
                1,
            )],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "VaR is a threshold, not a worst case.",
                "Expected Shortfall averages the losses beyond VaR.",
                "Risk grows with the square root of the holding period.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(ValueAtRiskEngine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_uses_tabulated_z() {
        let result = ValueAtRiskEngine.calculate(&module().default_parameters).unwrap();
        assert_eq!(result.number("z_score"), Some(1.645));
        let var = result.number("var").unwrap();
        let es = result.number("expected_shortfall").unwrap();
        assert!(es > var);
        assert_relative_eq!(
            result.number("var_amount").unwrap(),
            var * 1_000_000.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_every_offered_level_is_valid() {
        let m = module();
        for confidence in [0.90, 0.95, 0.975, 0.99, 0.995] {
            for vol in [0.01, 0.3, 1.0] {
                let params = m
                    .default_parameters
                    .clone()
                    .with("confidence", confidence)
                    .with("annual_volatility", vol)
                    .with("annual_return", 0.5);
                let result = ValueAtRiskEngine.calculate(&params).unwrap();
                assert!(ValueAtRiskEngine.is_valid(&params, &result), "c={confidence} vol={vol}");
            }
        }
    }

    #[test]
    fn test_tail_marking_matches_var() {
        let params = module().default_parameters;
        let result = ValueAtRiskEngine.calculate(&params).unwrap();
        let var = result.number("var").unwrap();
        let chart = ValueAtRiskEngine.generate(&params, &result, 3).unwrap();
        for p in &chart.get("return_density").unwrap().points {
            assert_eq!(p.field("in_tail") == Some(1.0), p.t <= -var);
        }
        assert!(chart.check().is_ok());
    }

    #[test]
    fn test_confidence_curve_rises() {
        let params = module().default_parameters;
        let result = ValueAtRiskEngine.calculate(&params).unwrap();
        let chart = ValueAtRiskEngine.generate(&params, &result, 3).unwrap();
        let curve = chart.get("confidence_curve").unwrap();
        assert!(curve.values().windows(2).all(|w| w[1] > w[0]));
        assert!(curve.points.iter().all(|p| p.field("expected_shortfall").unwrap() >= p.value));
    }
}
