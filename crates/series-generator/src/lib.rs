//! Deterministic, seed-driven series for lesson charts.
//!
//! Every generator takes an explicit [`SeededRng`] and a bounded size, so the
//! same seed and inputs always give bit-identical output.

pub mod density;
pub mod market;
pub mod memory;
pub mod rng;
pub mod volume;

pub use density::{histogram, linspace, normal_density};
pub use market::{
    path_efficiency, realized_volatility, simulate_path, MarketPathConfig, MarketStep, Regime, RegimeWeights,
    MAX_STEPS, MIXED_CADENCE,
};
pub use memory::{autocorrelation, estimate_hurst, fractional_memory_path, MemoryPath};
pub use rng::SeededRng;
pub use volume::{shape_volume, VolumeConfig, VolumePattern};
