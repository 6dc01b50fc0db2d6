//! Built-in lesson catalog.
//!
//! Each lesson module pairs a parameter schema and walkthrough with an engine
//! implementing [`LessonEngine`](lesson_core::LessonEngine). Engines hold no
//! state; everything they produce is a function of the parameters and seed.

use lesson_core::{LessonModule, Series, SeriesPoint};

pub mod fourier_analysis;
pub mod kelly_criterion;
pub mod long_memory;
pub mod market_regimes;
pub mod options_pricing;
pub mod value_at_risk;
pub mod vwap_execution;

pub use fourier_analysis::FourierEngine;
pub use kelly_criterion::KellyEngine;
pub use long_memory::LongMemoryEngine;
pub use market_regimes::MarketRegimeEngine;
pub use options_pricing::OptionsPricingEngine;
pub use value_at_risk::ValueAtRiskEngine;
pub use vwap_execution::VwapExecutionEngine;

/// Every lesson shipped with the application, in catalog order.
pub fn builtin_lessons() -> Vec<LessonModule> {
    vec![
        options_pricing::module(),
        kelly_criterion::module(),
        value_at_risk::module(),
        vwap_execution::module(),
        fourier_analysis::module(),
        market_regimes::module(),
        long_memory::module(),
    ]
}

pub(crate) fn series(name: &str, points: impl IntoIterator<Item = SeriesPoint>) -> Series {
    let points = points.into_iter();
    let mut out = Series::with_capacity(name, points.size_hint().0);
    for p in points {
        out.push(p);
    }
    out
}
