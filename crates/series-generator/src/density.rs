use lesson_math::normal_pdf;

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// `(x, density)` pairs of a normal distribution over `[low, high]`.
pub fn normal_density(mean: f64, std_dev: f64, low: f64, high: f64, points: usize) -> Vec<(f64, f64)> {
    if !(std_dev > 0.0) {
        return Vec::new();
    }
    linspace(low, high, points)
        .into_iter()
        .map(|x| (x, normal_pdf((x - mean) / std_dev) / std_dev))
        .collect()
}

/// Equal-width histogram normalized to a density (area 1).
///
/// Returns `(bin center, density)` pairs; empty input or zero bins give nothing.
pub fn histogram(values: &[f64], bins: usize) -> Vec<(f64, f64)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if high > low { (high - low) / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - low) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let total = values.len() as f64;
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (low + (i as f64 + 0.5) * width, c as f64 / (total * width)))
        .collect()
}
