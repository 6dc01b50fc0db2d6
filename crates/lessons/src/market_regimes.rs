use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    ParamValue, Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SelectOption, SeriesPoint, ValueFormat,
};
use series_generator::{
    histogram, path_efficiency, realized_volatility, simulate_path, MarketPathConfig, Regime, RegimeWeights, SeededRng,
    MIXED_CADENCE,
};

use crate::series;

pub const ID: &str = "market-regimes";

const RETURN_BINS: usize = 30;

/// Trending, choppy and mixed synthetic markets.
pub struct MarketRegimeEngine;

fn config(params: &ParameterSet) -> Result<MarketPathConfig, LessonError> {
    let name = params.require_choice("regime")?;
    let regime = Regime::parse(name).ok_or_else(|| LessonError::Calculation(format!("unknown regime '{name}'")))?;
    Ok(MarketPathConfig::new(
        params.require_number("base_price")?,
        params.require_number("volatility")?,
        params.require_number("steps")?.max(1.0) as usize,
        regime,
    )?)
}

/// Steps for a decaying quantity to halve when `retained` of it survives each step.
fn half_life(retained: f64) -> Option<f64> {
    (retained > 0.0 && retained < 1.0).then(|| 0.5f64.ln() / retained.ln())
}

fn weight_record(w: &RegimeWeights) -> [(&'static str, f64); 4] {
    [
        ("trend", w.trend),
        ("mean_reversion", w.mean_reversion),
        ("noise", w.noise),
        ("momentum_decay", w.momentum_decay),
    ]
}

impl LessonEngine for MarketRegimeEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let cfg = config(params)?;
        let mut result = CalculationResult::new();
        result
            .set_text("regime", cfg.regime.name())
            .set_number("steps", cfg.steps as f64)
            .set_number("price_floor", cfg.floor())
            .set_number("price_ceiling", cfg.ceiling());

        let rules: Vec<Regime> = match cfg.regime {
            Regime::Mixed => {
                result.set_number("switch_every", MIXED_CADENCE as f64);
                vec![Regime::Trending, Regime::Choppy]
            }
            other => vec![other],
        };
        for rule in rules {
            let w = rule.weights();
            result.set_record(&format!("{}_weights", rule.name()), &weight_record(&w));
            if let Some(h) = half_life(w.momentum_decay) {
                result.set_number(&format!("{}_momentum_half_life", rule.name()), h);
            }
            if let Some(h) = half_life(1.0 - w.mean_reversion) {
                result.set_number(&format!("{}_reversion_half_life", rule.name()), h);
            }
        }
        Ok(result)
    }

    fn generate(&self, params: &ParameterSet, _result: &CalculationResult, seed: u64) -> Result<ChartData, LessonError> {
        let cfg = config(params)?;
        let lookback = (params.require_number("lookback")?.max(2.0) as usize).min(cfg.steps.max(2));
        let path = simulate_path(&cfg, &mut SeededRng::new(seed));

        let mut chart = ChartData::new();
        chart.insert(series(
            "price",
            path.iter().enumerate().map(|(i, s)| {
                SeriesPoint::new(i as f64, s.price)
                    .with("momentum", s.momentum)
                    .with("floor", cfg.floor())
                    .with("ceiling", cfg.ceiling())
                    .with_label(s.regime.name())
            }),
        ));

        let efficiency = path_efficiency(cfg.base_price, &path);
        chart.insert(series(
            "rolling_volatility",
            path.windows(lookback).enumerate().map(|(i, window)| {
                SeriesPoint::new((i + lookback - 1) as f64, realized_volatility(window))
                    .with("efficiency", efficiency)
            }),
        ));

        let changes: Vec<f64> = path.iter().map(|s| s.change).collect();
        chart.insert(series(
            "return_distribution",
            histogram(&changes, RETURN_BINS)
                .into_iter()
                .map(|(x, d)| SeriesPoint::new(x, d)),
        ));
        Ok(chart)
    }

    fn is_valid(&self, _params: &ParameterSet, result: &CalculationResult) -> bool {
        match (result.number("price_floor"), result.number("price_ceiling")) {
            (Some(floor), Some(ceiling)) => floor > 0.0 && floor < ceiling,
            _ => false,
        }
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Reading Market Regimes", "market-structure", Difficulty::Beginner)
        .with_description("Compare trending, choppy and mixed markets built from momentum, mean reversion and noise.")
        .with_topics(&["regimes", "momentum", "mean-reversion", "volatility"])
        .with_estimated_minutes(15);

    let regimes = vec![
        SelectOption::choice("trending", "Trending"),
        SelectOption::choice("choppy", "Choppy"),
        SelectOption::choice("mixed", "Mixed"),
    ];

    let schema = vec![
        Parameter::select("regime", "Regime", regimes, ParamValue::from("trending")).with_category("market"),
        Parameter::slider("volatility", "Volatility per Step", 0.005, 0.05, 0.005, 0.015)
            .with_format(ValueFormat::Ratio { decimals: 1 })
            .with_category("market"),
        Parameter::slider("base_price", "Base Price", 20.0, 500.0, 10.0, 100.0)
            .with_format(ValueFormat::Currency { decimals: 0 })
            .with_category("market")
            .with_importance(Importance::Secondary),
        Parameter::slider("steps", "Steps", 50.0, 500.0, 50.0, 250.0)
            .with_format(ValueFormat::Integer)
            .with_category("simulation")
            .with_importance(Importance::Secondary),
        Parameter::slider("lookback", "Volatility Lookback", 5.0, 50.0, 5.0, 20.0)
            .with_format(ValueFormat::Integer)
            .with_category("simulation")
            .with_importance(Importance::Advanced),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "Markets Have Moods",
            "Some stretches trend for days; others chop back and forth around a level. Each step here is \
             a blend of momentum, a pull back toward the base price, and random noise.",
        ),
        PhaseDescriptor::formula(
            "step",
            "One Step of the Model",
            "P' = P + a m sigma P - k (P - P0) + c sigma P z",
            "m is decaying momentum, k the mean-reversion strength, z a standard normal draw.",
        ),
        PhaseDescriptor::explorer("explore", "Switch Regimes", &["regime", "volatility", "steps"]),
        PhaseDescriptor::chart("path", "The Price Path", &["price"], None),
        PhaseDescriptor::chart(
            "volatility",
            "Volatility Through Time",
            &["rolling_volatility", "return_distribution"],
            Some("Choppy markets show wider return distributions but go nowhere."),
        ),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![QuizQuestion::new(
                "Which regime pulls hardest back toward the base price?",
                &["Trending", "Choppy"],
                1,
            )],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "Momentum makes moves persist.",
                "Mean reversion caps how far price wanders.",
                "Strategies that work in one regime often fail in the other.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(MarketRegimeEngine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn defaults() -> ParameterSet {
        module().default_parameters
    }

    #[test]
    fn test_mixed_reports_both_rule_sets() {
        let params = defaults().with("regime", "mixed");
        let result = MarketRegimeEngine.calculate(&params).unwrap();
        assert!(result.record("trending_weights").is_some());
        assert!(result.record("choppy_weights").is_some());
        assert_eq!(result.number("switch_every"), Some(MIXED_CADENCE as f64));
    }

    #[test]
    fn test_half_lives() {
        let result = MarketRegimeEngine.calculate(&defaults()).unwrap();
        let h = result.number("trending_momentum_half_life").unwrap();
        assert_relative_eq!(0.95f64.powf(h), 0.5, epsilon = 1e-12);
        assert_eq!(half_life(1.0), None);
    }

    #[test]
    fn test_rolling_window_alignment() {
        let params = defaults();
        let result = MarketRegimeEngine.calculate(&params).unwrap();
        let chart = MarketRegimeEngine.generate(&params, &result, 42).unwrap();
        let rolling = chart.get("rolling_volatility").unwrap();
        assert_eq!(rolling.len(), 250 - 20 + 1);
        assert_eq!(rolling.points[0].t, 19.0);
        assert!(chart.check().is_ok());
    }

    #[test]
    fn test_labels_follow_mixed_cadence() {
        let params = defaults().with("regime", "mixed");
        let result = MarketRegimeEngine.calculate(&params).unwrap();
        let chart = MarketRegimeEngine.generate(&params, &result, 42).unwrap();
        let price = chart.get("price").unwrap();
        assert_eq!(price.points[0].label.as_deref(), Some("trending"));
        assert_eq!(price.points[MIXED_CADENCE].label.as_deref(), Some("choppy"));
    }
}
