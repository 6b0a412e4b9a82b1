//! Shared statistical toolkit for the feature extractors.

use std::collections::BTreeMap;

/// Arithmetic mean, 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, 0.0 for empty input.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Bucket event times into per-second counts over `[0, duration)`.
pub fn per_second_counts(times: impl Iterator<Item = f64>, duration: f64) -> Vec<usize> {
    let seconds = duration.ceil().max(0.0) as usize;
    let mut counts = vec![0usize; seconds];
    for time in times {
        if time >= 0.0 && time < duration {
            let idx = (time as usize).min(seconds.saturating_sub(1));
            counts[idx] += 1;
        }
    }
    counts
}

/// Bucket event times into fixed-width window counts over `[0, duration)`.
pub fn windowed_counts(times: impl Iterator<Item = f64>, duration: f64, window: f64) -> Vec<usize> {
    if window <= 0.0 || duration <= 0.0 {
        return Vec::new();
    }
    let windows = (duration / window).ceil() as usize;
    let mut counts = vec![0usize; windows.max(1)];
    for time in times {
        if time >= 0.0 && time < duration {
            let idx = ((time / window) as usize).min(counts.len() - 1);
            counts[idx] += 1;
        }
    }
    counts
}

/// Indices of the `k` largest values, in descending value order.
pub fn top_k_indices(values: &[f64], k: usize) -> Vec<usize> {
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed.into_iter().take(k).map(|(i, _)| i).collect()
}

/// Gaps between consecutive sorted event times.
pub fn inter_event_intervals(times: &[f64]) -> Vec<f64> {
    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.windows(2).map(|w| w[1] - w[0]).collect()
}

/// First-order Markov transition counts over a label sequence, keyed as
/// `"from->to"` so the matrix serializes as a flat JSON object.
pub fn transition_counts(sequence: &[String]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for pair in sequence.windows(2) {
        if pair[0] != pair[1] {
            *counts.entry(format!("{}->{}", pair[0], pair[1])).or_insert(0) += 1;
        }
    }
    counts
}

/// Number of adjacent label changes in a sequence.
pub fn transition_count(sequence: &[String]) -> usize {
    sequence.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

/// Least-squares slope of `values` against their indices.
pub fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = mean(values);

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Quadratic coefficient of a least-squares parabola fit, used to detect
/// u-shaped curves. Positive means the curve bows downward in the middle.
pub fn quadratic_coefficient(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    // Fit y = a*x^2 + b*x + c via normal equations on centered x.
    let x_mean = (n as f64 - 1.0) / 2.0;
    let xs: Vec<f64> = (0..n).map(|i| i as f64 - x_mean).collect();

    let s2 = xs.iter().map(|x| x * x).sum::<f64>();
    let s3 = xs.iter().map(|x| x * x * x).sum::<f64>();
    let s4 = xs.iter().map(|x| x * x * x * x).sum::<f64>();
    let sy = values.iter().sum::<f64>();
    let sxy = xs.iter().zip(values).map(|(x, y)| x * y).sum::<f64>();
    let sx2y = xs.iter().zip(values).map(|(x, y)| x * x * y).sum::<f64>();
    let n_f = n as f64;

    // Solve [n  0  s2][c]   [sy]
    //       [0  s2 s3][b] = [sxy]
    //       [s2 s3 s4][a]   [sx2y]
    let det = n_f * (s2 * s4 - s3 * s3) - s2 * (s2 * s2);
    if det.abs() < 1e-12 {
        return 0.0;
    }
    // Cramer's rule for the quadratic term.
    let det_a = n_f * (s2 * sx2y - s3 * sxy) - s2 * (s2 * sy);
    det_a / det
}

/// Fraction of `times_a` that have a neighbor in `times_b` within `window`.
pub fn alignment_ratio(times_a: &[f64], times_b: &[f64], window: f64) -> f64 {
    if times_a.is_empty() {
        return 0.0;
    }
    let aligned = times_a
        .iter()
        .filter(|a| times_b.iter().any(|b| (*a - b).abs() <= window))
        .count();
    aligned as f64 / times_a.len() as f64
}
