use std::f64::consts::PI;

const MULTIPLIER: u64 = 9301;
const INCREMENT: u64 = 49297;
const MODULUS: u64 = 233280;

/// Smallest uniform accepted by the Box-Muller log.
const MIN_UNIFORM: f64 = 1e-10;

/// Linear congruential generator: `x' = (x * 9301 + 49297) mod 233280`.
///
/// Small period and poor spectral properties, but every platform produces
/// the same sequence for a given seed, which is all the chart generators need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed % MODULUS,
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// Uniform draw in `[low, high)`.
    pub fn next_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Standard normal draw via Box-Muller. Consumes `u1` then `u2`.
    pub fn next_gaussian(&mut self) -> f64 {
        let u1 = self.next_f64().max(MIN_UNIFORM);
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    pub fn next_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.next_gaussian()
    }
}
