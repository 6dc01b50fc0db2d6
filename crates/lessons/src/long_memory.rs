use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SeriesPoint, ValueFormat,
};
use series_generator::{autocorrelation, estimate_hurst, fractional_memory_path, SeededRng};

use crate::series;

pub const ID: &str = "long-memory";

/// Band around 0.5 read as a random walk.
const RANDOM_WALK_BAND: f64 = 0.05;

/// Hurst exponents and long-memory paths.
pub struct LongMemoryEngine;

struct MemorySpec {
    hurst: f64,
    steps: usize,
    volatility: f64,
    max_lag: usize,
}

impl MemorySpec {
    fn from_params(params: &ParameterSet) -> Result<Self, LessonError> {
        Ok(Self {
            hurst: params.require_number("hurst")?,
            steps: params.require_number("steps")?.max(1.0) as usize,
            volatility: params.require_number("volatility")?,
            max_lag: params.require_number("max_lag")?.max(1.0) as usize,
        })
    }
}

pub fn classify(hurst: f64) -> &'static str {
    if (hurst - 0.5).abs() < RANDOM_WALK_BAND {
        "random walk"
    } else if hurst > 0.5 {
        "persistent"
    } else {
        "anti-persistent"
    }
}

impl LessonEngine for LongMemoryEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let spec = MemorySpec::from_params(params)?;
        let exponent = spec.hurst - 0.5;
        let last_scale = (spec.steps as f64).powf(exponent);

        let mut result = CalculationResult::new();
        result
            .set_number("scaling_exponent", exponent)
            .set_number("final_scale", last_scale)
            .set_number("variance_ratio", last_scale * last_scale)
            .set_number("range_growth", (spec.steps as f64).powf(spec.hurst))
            .set_text("behavior", classify(spec.hurst));
        Ok(result)
    }

    /// Path, increments, sample autocorrelation and a rescaled-range estimate
    /// of the exponent actually present in the generated increments.
    fn generate(&self, params: &ParameterSet, _result: &CalculationResult, seed: u64) -> Result<ChartData, LessonError> {
        let spec = MemorySpec::from_params(params)?;
        let path = fractional_memory_path(spec.hurst, spec.steps, spec.volatility, 0.0, &mut SeededRng::new(seed));

        let mut chart = ChartData::new();
        chart.insert(series(
            "levels",
            path.levels.iter().enumerate().map(|(i, v)| SeriesPoint::new(i as f64, *v)),
        ));
        chart.insert(series(
            "increments",
            path.increments.iter().enumerate().map(|(i, v)| {
                SeriesPoint::new((i + 1) as f64, *v).with("scale", ((i + 1) as f64).powf(path.hurst - 0.5))
            }),
        ));
        chart.insert(series(
            "autocorrelation",
            (1..=spec.max_lag.min(path.increments.len().saturating_sub(1)))
                .map(|lag| SeriesPoint::new(lag as f64, autocorrelation(&path.increments, lag))),
        ));

        let estimate = estimate_hurst(&path.increments);
        let mut summary = SeriesPoint::new(0.0, estimate.unwrap_or(0.5)).with("target", path.hurst);
        if estimate.is_none() {
            summary = summary.with_label("insufficient data");
        }
        chart.insert(series("hurst_estimate", [summary]));
        Ok(chart)
    }

    fn is_valid(&self, params: &ParameterSet, _result: &CalculationResult) -> bool {
        params.number("hurst").is_some_and(|h| h > 0.0 && h < 1.0)
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Long Memory and the Hurst Exponent", "time-series", Difficulty::Advanced)
        .with_description(
            "Generate series with a Hurst-like exponent and measure it back with rescaled-range analysis.",
        )
        .with_topics(&["hurst", "long-memory", "fractal", "autocorrelation"])
        .with_estimated_minutes(20)
        .with_prerequisites(&["market-regimes"]);

    let schema = vec![
        Parameter::slider("hurst", "Hurst Exponent", 0.05, 0.95, 0.05, 0.7)
            .with_format(ValueFormat::Fixed { decimals: 2 })
            .with_category("process"),
        Parameter::slider("volatility", "Step Volatility", 0.1, 3.0, 0.1, 1.0)
            .with_format(ValueFormat::Fixed { decimals: 1 })
            .with_category("process"),
        Parameter::slider("steps", "Steps", 128.0, 2_048.0, 128.0, 1_024.0)
            .with_format(ValueFormat::Integer)
            .with_category("simulation")
            .with_importance(Importance::Secondary),
        Parameter::slider("max_lag", "Autocorrelation Lags", 1.0, 50.0, 1.0, 20.0)
            .with_format(ValueFormat::Integer)
            .with_category("display")
            .with_importance(Importance::Advanced),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "Does the Past Echo?",
            "A Hurst exponent above one half describes a series whose moves tend to continue; below one half, \
             moves tend to reverse. At exactly one half the series is a random walk.",
        ),
        PhaseDescriptor::formula(
            "scaling",
            "Scaled Increments",
            "dX_i = sigma (i + 1)^(H - 1/2) z_i",
            "An approximation to fractional Brownian motion: increment size drifts with H, but the draws stay independent.",
        ),
        PhaseDescriptor::explorer("explore", "Dial the Exponent", &["hurst", "volatility", "steps"]),
        PhaseDescriptor::chart("path", "The Generated Path", &["levels", "increments"], None),
        PhaseDescriptor::chart(
            "diagnostics",
            "Measuring It Back",
            &["autocorrelation", "hurst_estimate"],
            Some("Rescaled-range analysis estimates H from the slope of log(R/S) against log(window)."),
        ),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![QuizQuestion::new(
                "A Hurst exponent of 0.3 suggests",
                &["Trend following", "Mean reversion", "A pure random walk"],
                1,
            )],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "H > 0.5 is persistent, H < 0.5 anti-persistent.",
                "R/S estimates are noisy on short samples.",
                "The generator here is an approximation, not exact fractional Brownian motion.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(LongMemoryEngine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_classification() {
        assert_eq!(classify(0.5), "random walk");
        assert_eq!(classify(0.8), "persistent");
        assert_eq!(classify(0.2), "anti-persistent");
    }

    #[test]
    fn test_scaling_figures() {
        let params = module().default_parameters.with("hurst", 0.7).with("steps", 1_024.0);
        let result = LongMemoryEngine.calculate(&params).unwrap();
        assert_relative_eq!(result.number("final_scale").unwrap(), 1_024f64.powf(0.2), epsilon = 1e-12);
        assert_eq!(result.text("behavior"), Some("persistent"));
    }

    #[test]
    fn test_generated_series() {
        let params = module().default_parameters;
        let result = LongMemoryEngine.calculate(&params).unwrap();
        let chart = LongMemoryEngine.generate(&params, &result, 42).unwrap();
        assert_eq!(chart.get("levels").unwrap().len(), 1_025);
        assert_eq!(chart.get("increments").unwrap().len(), 1_024);
        assert_eq!(chart.get("autocorrelation").unwrap().len(), 20);

        let estimate = &chart.get("hurst_estimate").unwrap().points[0];
        assert!((0.0..=1.0).contains(&estimate.value));
        assert_eq!(estimate.field("target"), Some(0.7));
        assert!(chart.check().is_ok());
    }
}
