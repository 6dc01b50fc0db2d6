use std::sync::Arc;

use chrono::{Duration, NaiveTime};
use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    ParamValue, Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SelectOption, SeriesPoint, ValueFormat,
};
use lesson_math::vwap::{slippage_bps, vwap_bands, Print};
use series_generator::{shape_volume, simulate_path, MarketPathConfig, Regime, SeededRng, VolumeConfig, VolumePattern, MAX_STEPS};

use crate::series;

pub const ID: &str = "vwap-execution";

/// Square-root impact coefficient (moderate liquidity).
const IMPACT_GAMMA: f64 = 0.2;

/// Executing a parent order against the session's volume-weighted price.
pub struct VwapExecutionEngine;

struct SessionSpec {
    base_price: f64,
    volatility: f64,
    bar_minutes: f64,
    bars: usize,
    pattern: VolumePattern,
    regime: Regime,
    base_volume: f64,
    order_size: f64,
    band_width: f64,
}

impl SessionSpec {
    fn from_params(params: &ParameterSet) -> Result<Self, LessonError> {
        let session_minutes = params.require_number("session_minutes")?;
        let bar_minutes = params.require_number("bar_minutes")?.max(1.0);
        let pattern_name = params.require_choice("volume_pattern")?;
        let regime_name = params.require_choice("regime")?;

        Ok(Self {
            base_price: params.require_number("base_price")?,
            volatility: params.require_number("volatility")?,
            bar_minutes,
            bars: ((session_minutes / bar_minutes).floor().max(1.0) as usize).min(MAX_STEPS),
            pattern: VolumePattern::parse(pattern_name)
                .ok_or_else(|| LessonError::Calculation(format!("unknown volume pattern '{pattern_name}'")))?,
            regime: Regime::parse(regime_name)
                .ok_or_else(|| LessonError::Calculation(format!("unknown regime '{regime_name}'")))?,
            base_volume: params.require_number("base_volume")?,
            order_size: params.require_number("order_size")?,
            band_width: params.require_number("band_width")?,
        })
    }

    fn fraction(&self, bar: usize) -> f64 {
        bar as f64 / self.bars.saturating_sub(1).max(1) as f64
    }

    /// Expected share of session volume traded in each bar.
    fn volume_profile(&self) -> Vec<f64> {
        let raw: Vec<f64> = (0..self.bars)
            .map(|i| self.pattern.expected_multiplier(self.fraction(i)))
            .collect();
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }

    fn expected_volume(&self) -> f64 {
        (0..self.bars)
            .map(|i| self.base_volume * self.pattern.expected_multiplier(self.fraction(i)))
            .sum()
    }

    fn clock(&self, bar: usize) -> Option<String> {
        let open = NaiveTime::from_hms_opt(9, 30, 0)?;
        let minutes = ((bar + 1) as f64 * self.bar_minutes) as i64;
        Some((open + Duration::minutes(minutes)).format("%H:%M").to_string())
    }
}

impl LessonEngine for VwapExecutionEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let spec = SessionSpec::from_params(params)?;
        let expected_volume = spec.expected_volume();
        if expected_volume <= 0.0 {
            return Err(LessonError::Calculation("expected session volume is zero".to_string()));
        }

        let participation = spec.order_size / expected_volume;
        let session_volatility = spec.volatility * (spec.bars as f64).sqrt();
        let impact = session_volatility * IMPACT_GAMMA * participation.sqrt();

        let mut result = CalculationResult::new();
        result
            .set_number("bars", spec.bars as f64)
            .set_number("expected_volume", expected_volume)
            .set_number("participation_rate", participation)
            .set_number("session_volatility", session_volatility)
            .set_number("impact_bps", impact * 10_000.0)
            .set_number("impact_cost", impact * spec.base_price * spec.order_size)
            .set_text("volume_pattern", spec.pattern.name())
            .set_text("regime", spec.regime.name());
        Ok(result)
    }

    /// A simulated session: prices, shaped volume, VWAP with bands, and a
    /// schedule that slices the order along the expected volume profile.
    fn generate(&self, params: &ParameterSet, _result: &CalculationResult, seed: u64) -> Result<ChartData, LessonError> {
        let spec = SessionSpec::from_params(params)?;
        let config = MarketPathConfig::new(spec.base_price, spec.volatility, spec.bars, spec.regime)?;

        let mut rng = SeededRng::new(seed);
        let path = simulate_path(&config, &mut rng);
        let prices: Vec<f64> = path.iter().map(|s| s.price).collect();
        let volumes = shape_volume(&VolumeConfig::new(spec.base_volume, spec.pattern), &prices, &mut rng);

        let minute = |i: usize| (i + 1) as f64 * spec.bar_minutes;
        let prints: Vec<Print> = prices
            .iter()
            .zip(&volumes)
            .enumerate()
            .map(|(i, (p, v))| Print::new(minute(i), *p, *v))
            .collect();
        let bands = vwap_bands(&prints, spec.band_width);

        let mut chart = ChartData::new();
        chart.insert(series(
            "price",
            prints.iter().enumerate().map(|(i, p)| {
                let point = SeriesPoint::new(p.time, p.price);
                match spec.clock(i) {
                    Some(label) => point.with_label(label),
                    None => point,
                }
            }),
        ));
        chart.insert(series(
            "vwap",
            bands
                .iter()
                .map(|b| SeriesPoint::new(b.time, b.vwap).with("upper", b.upper).with("lower", b.lower)),
        ));
        chart.insert(series(
            "volume",
            prints
                .iter()
                .map(|p| SeriesPoint::new(p.time, p.volume).with("price", p.price)),
        ));

        let mut filled = 0.0;
        let mut notional = 0.0;
        let mut schedule = Vec::with_capacity(spec.bars);
        for ((weight, print), band) in spec.volume_profile().into_iter().zip(&prints).zip(&bands) {
            let child = spec.order_size * weight;
            filled += child;
            notional += child * print.price;
            let average_fill = if filled > 0.0 { notional / filled } else { print.price };
            schedule.push(
                SeriesPoint::new(print.time, filled)
                    .with("child_order", child)
                    .with("average_fill", average_fill)
                    .with("slippage_bps", slippage_bps(average_fill, band.vwap, true)),
            );
        }
        chart.insert(series("execution", schedule));

        Ok(chart)
    }

    fn is_valid(&self, _params: &ParameterSet, result: &CalculationResult) -> bool {
        result
            .number("participation_rate")
            .is_some_and(|p| p > 0.0 && p <= 1.0)
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Trading Against VWAP", "execution", Difficulty::Advanced)
        .with_description(
            "Follow the volume-weighted average price through a simulated session and slice a large order to track it.",
        )
        .with_topics(&["vwap", "execution", "market-impact", "volume"])
        .with_estimated_minutes(30)
        .with_prerequisites(&["market-regimes"]);

    let bar_sizes = vec![
        SelectOption::number(1.0, "1 minute"),
        SelectOption::number(5.0, "5 minutes"),
        SelectOption::number(15.0, "15 minutes"),
    ];
    let patterns = vec![
        SelectOption::choice("u-shaped", "U-Shaped"),
        SelectOption::choice("declining", "Declining"),
        SelectOption::choice("random", "Random"),
        SelectOption::choice("spike", "Midday Spike"),
    ];
    let regimes = vec![
        SelectOption::choice("trending", "Trending"),
        SelectOption::choice("choppy", "Choppy"),
        SelectOption::choice("mixed", "Mixed"),
    ];

    let schema = vec![
        Parameter::input("order_size", "Order Size", 1_000.0, 5_000_000.0, 1_000.0, 100_000.0)
            .with_unit("shares")
            .with_format(ValueFormat::Integer)
            .with_category("order"),
        Parameter::select("volume_pattern", "Volume Pattern", patterns, ParamValue::from("u-shaped"))
            .with_category("market"),
        Parameter::select("regime", "Price Regime", regimes, ParamValue::from("mixed")).with_category("market"),
        Parameter::slider("base_price", "Opening Price", 10.0, 500.0, 1.0, 100.0)
            .with_format(ValueFormat::Currency { decimals: 2 })
            .with_category("market"),
        Parameter::slider("volatility", "Volatility per Bar", 0.001, 0.05, 0.001, 0.01)
            .with_format(ValueFormat::Ratio { decimals: 1 })
            .with_category("market"),
        Parameter::input("base_volume", "Average Bar Volume", 1_000.0, 1_000_000.0, 1_000.0, 50_000.0)
            .with_format(ValueFormat::Integer)
            .with_category("market")
            .with_importance(Importance::Secondary),
        Parameter::slider("session_minutes", "Session Length", 30.0, 390.0, 30.0, 390.0)
            .with_unit("min")
            .with_format(ValueFormat::Integer)
            .with_category("session")
            .with_importance(Importance::Secondary),
        Parameter::select("bar_minutes", "Bar Size", bar_sizes, ParamValue::from(5.0))
            .with_category("session")
            .with_importance(Importance::Advanced),
        Parameter::slider("band_width", "Band Width", 0.5, 3.0, 0.5, 2.0)
            .with_unit("sd")
            .with_format(ValueFormat::Fixed { decimals: 1 })
            .with_category("display")
            .with_importance(Importance::Advanced),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "The Benchmark Everyone Watches",
            "VWAP is the average price paid for every share traded so far, weighted by size. Institutions \
             judge a large order by how close its average fill lands to the session VWAP.",
        ),
        PhaseDescriptor::formula(
            "formula",
            "Running VWAP",
            "VWAP_t = sum(price_i x volume_i) / sum(volume_i)",
            "Sums run from the open to bar t. The first bar's VWAP is its own price.",
        ),
        PhaseDescriptor::chart(
            "session",
            "A Simulated Session",
            &["price", "vwap", "volume"],
            Some("The bands mark volume-weighted standard deviations around VWAP."),
        ),
        PhaseDescriptor::explorer(
            "explore",
            "Change the Session",
            &["volume_pattern", "regime", "volatility", "order_size"],
        ),
        PhaseDescriptor::chart(
            "execution",
            "Slicing the Order",
            &["execution"],
            Some("Child orders follow the expected volume curve; slippage is measured against running VWAP."),
        ),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![
                QuizQuestion::new(
                    "Prints of (10, 100), (12, 50) and (9, 150) give what final VWAP?",
                    &["10.00", "9.83", "10.33"],
                    1,
                ),
                QuizQuestion::new(
                    "Doubling the order size multiplies square-root impact by about",
                    &["1.41", "2", "4"],
                    0,
                ),
            ],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "VWAP weights each price by the volume that traded there.",
                "Trading in proportion to volume keeps fills close to VWAP.",
                "Impact grows with the square root of participation.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(VwapExecutionEngine))
}
