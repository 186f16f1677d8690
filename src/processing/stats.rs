//! Descriptive statistics over sample windows.
//!
//! Conventions: population standard deviation, biased skewness, Fisher
//! (excess) kurtosis, linearly interpolated percentiles. Degenerate inputs
//! (empty or constant) produce 0 rather than NaN.

use statrs::statistics::Statistics;

pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.mean()
}

pub fn std_dev(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.population_std_dev()
}

pub fn min(x: &[f64]) -> f64 {
    x.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

pub fn max(x: &[f64]) -> f64 {
    x.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Peak-to-peak range.
pub fn range(x: &[f64]) -> f64 {
    max(x) - min(x)
}

pub fn rms(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
}

/// Mean absolute deviation around the mean.
pub fn mean_abs_deviation(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|v| (v - m).abs()).sum::<f64>() / x.len() as f64
}

/// Percentile `q` in [0, 100] with linear interpolation between order
/// statistics.
pub fn percentile(x: &[f64], q: f64) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let mut sorted = x.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return 0.0;
    };
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if hi >= sorted.len() {
        return last;
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(x: &[f64]) -> f64 {
    percentile(x, 50.0)
}

/// Central moments m2, m3, m4 (biased), or `None` when the variance is
/// indistinguishable from zero.
fn central_moments(x: &[f64]) -> Option<(f64, f64, f64)> {
    if x.is_empty() {
        return None;
    }
    let n = x.len() as f64;
    let m = mean(x);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in x {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    if m2 <= (f64::EPSILON * m).powi(2) || m2 == 0.0 {
        return None;
    }
    Some((m2, m3, m4))
}

pub fn skewness(x: &[f64]) -> f64 {
    central_moments(x).map_or(0.0, |(m2, m3, _)| m3 / m2.powf(1.5))
}

/// Excess kurtosis (normal distribution = 0).
pub fn kurtosis(x: &[f64]) -> f64 {
    central_moments(x).map_or(0.0, |(m2, _, m4)| m4 / (m2 * m2) - 3.0)
}

/// Pearson correlation; 0 when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        (sxy / denominator).clamp(-1.0, 1.0)
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Number of adjacent pairs whose sign differs (zero has its own sign).
pub fn sign_changes(x: &[f64]) -> usize {
    x.windows(2).filter(|w| sign(w[0]) != sign(w[1])).count()
}

/// Sign changes of the mean-removed signal.
pub fn mean_crossings(x: &[f64]) -> usize {
    let m = mean(x);
    x.windows(2)
        .filter(|w| sign(w[0] - m) != sign(w[1] - m))
        .count()
}

/// Coefficient of variation (population), 0 for a zero mean.
pub fn coefficient_of_variation(x: &[f64]) -> f64 {
    let m = mean(x);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(x) / m.abs()
}

/// Round half away from zero to `decimals` places.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_moments() {
        let x = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&x) - 5.0).abs() < 1e-12);
        assert!((std_dev(&x) - 2.0).abs() < 1e-12);
        assert!((rms(&[3.0, 4.0]) - (12.5f64).sqrt()).abs() < 1e-12);
        assert!((range(&x) - 7.0).abs() < 1e-12);
        assert!((mean_abs_deviation(&x) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_percentiles_interpolate() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&x, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&x, 75.0) - 3.25).abs() < 1e-12);
        assert!((median(&x) - 2.5).abs() < 1e-12);
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_skew_and_kurtosis() {
        let symmetric = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!(skewness(&symmetric).abs() < 1e-12);
        // Uniform-like discrete sample: excess kurtosis = 1.7 - 3
        assert!((kurtosis(&symmetric) + 1.3).abs() < 1e-12);

        let right_tail = [0.0, 0.0, 0.0, 10.0];
        assert!(skewness(&right_tail) > 0.0);
    }

    #[test]
    fn test_constant_signal_is_not_nan() {
        let flat = [4.2; 16];
        assert_eq!(skewness(&flat), 0.0);
        assert_eq!(kurtosis(&flat), 0.0);
        assert_eq!(std_dev(&flat), 0.0);
        assert_eq!(pearson(&flat, &[1.0; 16]), 0.0);
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        let z = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&x, &z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sign_changes() {
        assert_eq!(sign_changes(&[1.0, -1.0, 1.0, -1.0]), 3);
        // Zero counts as its own sign
        assert_eq!(sign_changes(&[1.0, 0.0, 1.0]), 2);
        assert_eq!(mean_crossings(&[10.0, 12.0, 10.0, 12.0]), 3);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(min(&[]), 0.0);
        assert_eq!(sign_changes(&[]), 0);
    }

    #[test]
    fn test_round_to() {
        assert!((round_to(12.345, 1) - 12.3).abs() < 1e-12);
        assert!((round_to(12.36, 1) - 12.4).abs() < 1e-12);
        assert!((round_to(1.005_1, 2) - 1.01).abs() < 1e-12);
    }
}
