use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    ParamValue, Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SelectOption, SeriesPoint, ValueFormat,
};
use lesson_math::kelly::{analyze, growth_rate, LOG_EPSILON};
use series_generator::{linspace, SeededRng};

use crate::series;

pub const ID: &str = "kelly-criterion";

const MAX_BETS: usize = 1_000;
const GROWTH_POINTS: usize = 101;
/// Largest log-multiple reported as a bankroll before exp() would overflow.
const MAX_LOG_MULTIPLE: f64 = 690.0;

/// Bet sizing by the Kelly criterion.
pub struct KellyEngine;

struct BetSpec {
    win_probability: f64,
    payoff_ratio: f64,
    multiplier: f64,
    bankroll: f64,
    bets: usize,
}

impl BetSpec {
    fn from_params(params: &ParameterSet) -> Result<Self, LessonError> {
        Ok(Self {
            win_probability: params.require_number("win_probability")?,
            payoff_ratio: params.require_number("payoff_ratio")?,
            multiplier: params.require_number("kelly_multiplier")?,
            bankroll: params.require_number("initial_bankroll")?,
            bets: (params.require_number("num_bets")?.max(0.0) as usize).min(MAX_BETS),
        })
    }
}

impl LessonEngine for KellyEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let spec = BetSpec::from_params(params)?;
        let analysis = analyze(spec.win_probability, spec.payoff_ratio, spec.multiplier)?;

        let expected_log_growth = analysis.growth_fractional * spec.bets as f64;

        let mut result = CalculationResult::new();
        result
            .set_number("kelly_fraction", analysis.kelly_fraction)
            .set_number("kelly_percent", analysis.kelly_fraction * 100.0)
            .set_number("fractional_kelly", analysis.fractional_kelly)
            .set_number("bet_size", analysis.fractional_kelly * spec.bankroll)
            .set_number("edge", analysis.edge)
            .set_number("growth_full", analysis.growth_full)
            .set_number("growth_fractional", analysis.growth_fractional)
            .set_number("growth_double", analysis.growth_double)
            .set_number("expected_log_growth", expected_log_growth)
            .set_number(
                "expected_final_bankroll",
                spec.bankroll * expected_log_growth.min(MAX_LOG_MULTIPLE).exp(),
            )
            .set_flag("has_edge", analysis.edge > 0.0);
        if let Some(bets) = analysis.bets_to_double {
            result.set_number("bets_to_double", bets);
        }
        Ok(result)
    }

    /// Growth curve over every bet fraction, and three bankrolls that face
    /// the same sequence of wins and losses at different sizes.
    fn generate(&self, params: &ParameterSet, result: &CalculationResult, seed: u64) -> Result<ChartData, LessonError> {
        let spec = BetSpec::from_params(params)?;
        let full = result.require_number("kelly_fraction")?;
        let fractional = result.require_number("fractional_kelly")?;
        let strategies = [
            ("log_wealth_full", full),
            ("log_wealth_fractional", fractional),
            ("log_wealth_double", (2.0 * full).min(1.0)),
        ];

        let mut chart = ChartData::new();
        chart.insert(series(
            "growth_curve",
            linspace(0.0, 1.0, GROWTH_POINTS).into_iter().map(|f| {
                SeriesPoint::new(f, growth_rate(f, spec.win_probability, spec.payoff_ratio))
            }),
        ));

        let mut rng = SeededRng::new(seed);
        let outcomes: Vec<bool> = (0..spec.bets)
            .map(|_| rng.next_f64() < spec.win_probability)
            .collect();

        for (name, fraction) in strategies {
            let win = (1.0 + fraction * spec.payoff_ratio).max(LOG_EPSILON).ln();
            let loss = (1.0 - fraction).max(LOG_EPSILON).ln();
            let mut log_wealth = 0.0;
            let mut points = Vec::with_capacity(spec.bets + 1);
            points.push(SeriesPoint::new(0.0, 0.0).with("fraction", fraction));
            for (i, won) in outcomes.iter().enumerate() {
                log_wealth += if *won { win } else { loss };
                points.push(SeriesPoint::new((i + 1) as f64, log_wealth).with("won", if *won { 1.0 } else { 0.0 }));
            }
            chart.insert(series(name, points));
        }

        Ok(chart)
    }

    fn is_valid(&self, _params: &ParameterSet, result: &CalculationResult) -> bool {
        let percent_ok = result
            .number("kelly_percent")
            .is_some_and(|p| (0.0..=100.0).contains(&p));
        let growth_ok = ["growth_full", "growth_fractional", "growth_double"]
            .iter()
            .all(|k| result.number(k).is_some_and(f64::is_finite));
        percent_ok && growth_ok
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Sizing Bets with the Kelly Criterion", "position-sizing", Difficulty::Beginner)
        .with_description("Find the bet size that maximizes long-run growth and see what over-betting does to a bankroll.")
        .with_topics(&["kelly", "position-sizing", "growth", "risk-of-ruin"])
        .with_estimated_minutes(15);

    let multipliers = vec![
        SelectOption::number(0.25, "Quarter Kelly"),
        SelectOption::number(0.5, "Half Kelly"),
        SelectOption::number(1.0, "Full Kelly"),
        SelectOption::number(2.0, "Double Kelly"),
    ];

    let schema = vec![
        Parameter::slider("win_probability", "Win Probability", 0.01, 0.99, 0.01, 0.6)
            .with_format(ValueFormat::Ratio { decimals: 0 })
            .with_category("bet"),
        Parameter::slider("payoff_ratio", "Payoff Ratio", 0.1, 5.0, 0.1, 2.0)
            .with_format(ValueFormat::Multiple { decimals: 1 })
            .with_category("bet"),
        Parameter::select("kelly_multiplier", "Kelly Multiplier", multipliers, ParamValue::from(0.5))
            .with_format(ValueFormat::Multiple { decimals: 2 })
            .with_category("sizing"),
        Parameter::input("initial_bankroll", "Starting Bankroll", 100.0, 1_000_000.0, 100.0, 10_000.0)
            .with_format(ValueFormat::Currency { decimals: 0 })
            .with_category("sizing")
            .with_importance(Importance::Secondary),
        Parameter::slider("num_bets", "Number of Bets", 10.0, 500.0, 10.0, 100.0)
            .with_format(ValueFormat::Integer)
            .with_category("simulation")
            .with_importance(Importance::Advanced),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "Too Little, Too Much",
            "Bet too small and capital sits idle. Bet too large and a run of losses wipes you out. \
             The Kelly fraction is the size that maximizes the expected logarithm of wealth.",
        ),
        PhaseDescriptor::formula(
            "formula",
            "The Kelly Fraction",
            "f* = p - (1 - p) / b",
            "p is the probability of winning and b is the amount won per unit staked.",
        ),
        PhaseDescriptor::explorer("explore", "Size the Bet", &["win_probability", "payoff_ratio", "kelly_multiplier"]),
        PhaseDescriptor::chart(
            "growth",
            "Growth Rate by Bet Size",
            &["growth_curve"],
            Some("Growth peaks at f* and turns negative past roughly twice f*."),
        ),
        PhaseDescriptor::chart(
            "simulation",
            "Same Luck, Different Sizes",
            &["log_wealth_full", "log_wealth_fractional", "log_wealth_double"],
            None,
        ),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![QuizQuestion::new(
                "With a 60% win rate and 2:1 payoff, what fraction does Kelly stake?",
                &["20%", "40%", "60%"],
                1,
            )],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "No edge means no bet.",
                "Fractional Kelly gives up a little growth for much smaller drawdowns.",
                "Betting twice Kelly has roughly zero expected growth.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(KellyEngine))
}
