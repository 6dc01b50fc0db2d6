use serde::{Deserialize, Serialize};

/// One trade (or bar) contributing to VWAP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Print {
    pub time: f64,
    pub price: f64,
    pub volume: f64,
}

impl Print {
    pub fn new(time: f64, price: f64, volume: f64) -> Self {
        Self { time, price, volume }
    }
}

/// VWAP with volume-weighted standard deviation bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VwapBand {
    pub time: f64,
    pub vwap: f64,
    pub upper: f64,
    pub lower: f64,
    pub cumulative_volume: f64,
}

/// Running sums behind an incremental VWAP.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    price_volume: f64,
    price_sq_volume: f64,
    volume: f64,
}

impl Accumulator {
    fn add(&mut self, price: f64, volume: f64) {
        let volume = volume.max(0.0);
        self.price_volume += price * volume;
        self.price_sq_volume += price * price * volume;
        self.volume += volume;
    }

    /// Falls back to `fallback` until any volume has traded.
    fn vwap(&self, fallback: f64) -> f64 {
        if self.volume > 0.0 {
            self.price_volume / self.volume
        } else {
            fallback
        }
    }

    fn std_dev(&self) -> f64 {
        if self.volume <= 0.0 {
            return 0.0;
        }
        let mean = self.price_volume / self.volume;
        (self.price_sq_volume / self.volume - mean * mean).max(0.0).sqrt()
    }
}

/// Volume-Weighted Average Price after each print.
///
/// The first value is the first print's price; while no volume has traded
/// the current price is used.
pub fn cumulative_vwap(prints: &[Print]) -> Vec<f64> {
    let mut acc = Accumulator::default();
    prints
        .iter()
        .map(|p| {
            acc.add(p.price, p.volume);
            acc.vwap(p.price)
        })
        .collect()
}

/// VWAP with bands `width` standard deviations either side.
pub fn vwap_bands(prints: &[Print], width: f64) -> Vec<VwapBand> {
    let mut acc = Accumulator::default();
    prints
        .iter()
        .map(|p| {
            acc.add(p.price, p.volume);
            let vwap = acc.vwap(p.price);
            let spread = width * acc.std_dev();
            VwapBand {
                time: p.time,
                vwap,
                upper: vwap + spread,
                lower: vwap - spread,
                cumulative_volume: acc.volume,
            }
        })
        .collect()
}

/// One VWAP value per distinct timestamp.
///
/// Prints sharing a timestamp are folded in a canonical order, so the result
/// does not depend on how they were ordered within the bucket.
pub fn bucketed_vwap(prints: &[Print]) -> Vec<(f64, f64)> {
    let mut acc = Accumulator::default();
    let mut out = Vec::new();
    let mut start = 0;

    while start < prints.len() {
        let time = prints[start].time;
        let mut end = start + 1;
        while end < prints.len() && prints[end].time == time {
            end += 1;
        }

        let mut bucket: Vec<Print> = prints[start..end].to_vec();
        bucket.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.volume.total_cmp(&b.volume)));
        for p in &bucket {
            acc.add(p.price, p.volume);
        }
        let mean_price = bucket.iter().map(|p| p.price).sum::<f64>() / bucket.len() as f64;
        out.push((time, acc.vwap(mean_price)));

        start = end;
    }
    out
}

/// Execution cost against VWAP in basis points. Positive means the fill was
/// worse than VWAP for the given side.
pub fn slippage_bps(execution_price: f64, vwap: f64, is_buy: bool) -> f64 {
    if vwap <= 0.0 {
        return 0.0;
    }
    let diff = (execution_price - vwap) / vwap * 10_000.0;
    if is_buy {
        diff
    } else {
        -diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_three_print_sequence() {
        let prints = [
            Print::new(0.0, 10.0, 100.0),
            Print::new(1.0, 12.0, 50.0),
            Print::new(2.0, 9.0, 150.0),
        ];
        let v = cumulative_vwap(&prints);
        assert_relative_eq!(v[0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(v[1], 1600.0 / 150.0, epsilon = 1e-12);
        assert_relative_eq!(v[2], 2950.0 / 300.0, epsilon = 1e-12);
        assert_eq!(format!("{:.3}", v[1]), "10.667");
        assert_eq!(format!("{:.3}", v[2]), "9.833");
    }

    #[test]
    fn test_single_print_is_its_price() {
        assert_eq!(cumulative_vwap(&[Print::new(0.0, 42.5, 7.0)]), vec![42.5]);
        assert_eq!(bucketed_vwap(&[Print::new(0.0, 42.5, 7.0)]), vec![(0.0, 42.5)]);
    }

    #[test]
    fn test_zero_volume_falls_back_to_price() {
        let v = cumulative_vwap(&[Print::new(0.0, 10.0, 0.0), Print::new(1.0, 11.0, 0.0)]);
        assert_eq!(v, vec![10.0, 11.0]);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_reordering_within_bucket_does_not_matter() {
        let a = [
            Print::new(0.0, 10.1, 300.0),
            Print::new(0.0, 9.7, 120.0),
            Print::new(0.0, 10.3, 75.0),
            Print::new(1.0, 10.0, 500.0),
            Print::new(1.0, 10.2, 40.0),
        ];
        let b = [a[2], a[0], a[1], a[4], a[3]];
        assert_eq!(bucketed_vwap(&a), bucketed_vwap(&b));
        assert_eq!(bucketed_vwap(&a).len(), 2);
    }

    #[test]
    fn test_reordering_across_time_changes_the_path() {
        let a = [Print::new(0.0, 10.0, 100.0), Print::new(1.0, 20.0, 100.0)];
        let b = [Print::new(0.0, 20.0, 100.0), Print::new(1.0, 10.0, 100.0)];
        assert_ne!(bucketed_vwap(&a), bucketed_vwap(&b));
    }

    #[test]
    fn test_bands_bracket_vwap() {
        let prints: Vec<Print> = (0..20)
            .map(|i| Print::new(i as f64, 100.0 + (i % 5) as f64, 1000.0))
            .collect();
        let bands = vwap_bands(&prints, 2.0);
        assert_eq!(bands[0].upper, bands[0].vwap);
        for b in &bands[1..] {
            assert!(b.upper > b.vwap && b.lower < b.vwap);
        }
        assert_relative_eq!(bands[19].cumulative_volume, 20_000.0);
    }

    #[test]
    fn test_slippage_sign() {
        assert_relative_eq!(slippage_bps(100.5, 100.0, true), 50.0, epsilon = 1e-9);
        assert_relative_eq!(slippage_bps(100.5, 100.0, false), -50.0, epsilon = 1e-9);
    }
}
