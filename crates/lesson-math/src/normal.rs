//! Standard normal distribution helpers.
//!
//! The CDF uses the Abramowitz and Stegun 7.1.26 rational approximation of the
//! error function (max absolute error 1.5e-7). The coefficients are fixed so
//! that every lesson computes bit-identical prices.

use std::f64::consts::{PI, SQRT_2};

const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

/// z-scores for the confidence levels lessons offer directly.
const Z_TABLE: [(f64, f64); 5] = [
    (0.90, 1.282),
    (0.95, 1.645),
    (0.975, 1.960),
    (0.99, 2.326),
    (0.995, 2.576),
];

/// Error function (Abramowitz and Stegun 7.1.26).
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal probability density function.
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Inverse of [`normal_cdf`] by bisection, so it stays consistent with the
/// approximation used everywhere else.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p <= 0.0 {
        return -10.0;
    }
    if p >= 1.0 {
        return 10.0;
    }
    let (mut lo, mut hi) = (-10.0_f64, 10.0_f64);
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if normal_cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// One-sided z-score for a confidence level such as 0.95.
///
/// Tabulated levels return their textbook value (0.95 -> 1.645). Any other
/// level in (0, 1) is inverted numerically from the same CDF approximation.
pub fn z_for_confidence(confidence: f64) -> f64 {
    Z_TABLE
        .iter()
        .find(|(level, _)| (level - confidence).abs() < 1e-9)
        .map(|(_, z)| *z)
        .unwrap_or_else(|| inverse_normal_cdf(confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::distribution::{Continuous, ContinuousCDF, Normal};

    #[test]
    fn test_cdf_matches_reference_distribution() {
        let reference = Normal::new(0.0, 1.0).unwrap();
        for i in -40..=40 {
            let x = i as f64 / 10.0;
            assert!(
                (normal_cdf(x) - reference.cdf(x)).abs() < 1e-6,
                "cdf mismatch at {x}"
            );
            assert_relative_eq!(normal_pdf(x), reference.pdf(x), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cdf_symmetry_and_center() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-9);
        for x in [0.3, 1.0, 1.96, 3.5] {
            assert_relative_eq!(normal_cdf(x) + normal_cdf(-x), 1.0, epsilon = 1e-12);
        }
        // The published coefficients sum to 1 - 1e-9, not exactly 1
        assert!(erf(0.0).abs() < 1e-8);
    }

    #[test]
    fn test_density_at_95_percent_z() {
        let z = z_for_confidence(0.95);
        assert_eq!(z, 1.645);
        assert_relative_eq!(normal_pdf(z), 0.1031, epsilon = 1e-4);
    }

    #[test]
    fn test_untabulated_confidence_is_inverted() {
        let z = z_for_confidence(0.80);
        assert_relative_eq!(z, 0.8416, epsilon = 1e-3);
        assert_relative_eq!(normal_cdf(z), 0.80, epsilon = 1e-9);
        assert_eq!(z_for_confidence(0.99), 2.326);
    }
}
