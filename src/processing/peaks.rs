//! Peak detection in vertical/magnitude acceleration.
//!
//! Follows the usual `find_peaks` rules: flat peaks resolve to their
//! midpoint, the distance constraint keeps the tallest peaks first, and the
//! prominence of a peak is measured against the higher of the two lowest
//! points reachable on each side before meeting a taller sample.

/// Peak selection constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCriteria {
    /// Minimum horizontal distance between kept peaks (samples, >= 1)
    pub min_distance: usize,
    /// Minimum topographic prominence, `None` disables the check
    pub min_prominence: Option<f64>,
}

impl Default for PeakCriteria {
    fn default() -> Self {
        Self {
            min_distance: 1,
            min_prominence: None,
        }
    }
}

/// Indices of the peaks of `x` that satisfy `criteria`, in ascending order.
pub fn find_peaks(x: &[f64], criteria: &PeakCriteria) -> Vec<usize> {
    let mut peaks = local_maxima(x);

    if criteria.min_distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(x, &peaks, criteria.min_distance);
    }

    if let Some(min_prominence) = criteria.min_prominence {
        peaks.retain(|&p| prominence(x, p) >= min_prominence);
    }

    peaks
}

/// Strict local maxima; plateaus report their (lower) midpoint.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    let i_max = n - 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let right = ahead - 1;
                peaks.push((i + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let n = peaks.len();
    let mut keep = vec![true; n];

    // Tallest first; among equal heights the later peak wins
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        x[peaks[a]]
            .partial_cmp(&x[peaks[b]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < n && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Topographic prominence of the sample at `peak`.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    let mut i = peak;
    loop {
        if x[i] > height {
            break;
        }
        left_min = left_min.min(x[i]);
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    for &v in &x[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Centered moving average; windows are truncated at the edges.
pub fn moving_average(x: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || x.is_empty() {
        return x.to_vec();
    }
    let n = x.len();
    let half_left = (window - 1) / 2;
    let half_right = window / 2;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &v in x {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half_left);
            let hi = (i + half_right + 1).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_simple_peaks() {
        let x = [0.0, 1.0, 0.0, 2.0, 0.0, 1.5, 0.0];
        assert_eq!(find_peaks(&x, &PeakCriteria::default()), vec![1, 3, 5]);
    }

    #[test]
    fn test_edges_are_never_peaks() {
        let x = [5.0, 1.0, 0.0, 1.0, 5.0];
        assert!(find_peaks(&x, &PeakCriteria::default()).is_empty());
    }

    #[test]
    fn test_plateau_midpoint() {
        let x = [0.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(find_peaks(&x, &PeakCriteria::default()), vec![2]);
        let x = [0.0, 1.0, 1.0, 0.0];
        assert_eq!(find_peaks(&x, &PeakCriteria::default()), vec![1]);
    }

    #[test]
    fn test_distance_keeps_tallest() {
        let x = [0.0, 1.0, 0.0, 3.0, 0.0, 2.0, 0.0];
        let criteria = PeakCriteria {
            min_distance: 3,
            min_prominence: None,
        };
        assert_eq!(find_peaks(&x, &criteria), vec![3]);
    }

    #[test]
    fn test_prominence() {
        let x = [0.0, 3.0, 2.5, 2.8, 0.0];
        assert!((prominence(&x, 1) - 3.0).abs() < 1e-12);
        assert!((prominence(&x, 3) - 0.3).abs() < 1e-12);

        let criteria = PeakCriteria {
            min_distance: 1,
            min_prominence: Some(0.5),
        };
        assert_eq!(find_peaks(&x, &criteria), vec![1]);
    }

    #[test]
    fn test_periodic_signal_peak_count() {
        let fs = 50.0;
        let x: Vec<f64> = (0..500)
            .map(|i| (2.0 * PI * 1.0 * i as f64 / fs).sin())
            .collect();
        let criteria = PeakCriteria {
            min_distance: 20,
            min_prominence: Some(0.5),
        };
        assert_eq!(find_peaks(&x, &criteria).len(), 10);
    }

    #[test]
    fn test_moving_average() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = moving_average(&x, 3);
        assert!((smoothed[0] - 1.5).abs() < 1e-12);
        assert!((smoothed[2] - 3.0).abs() < 1e-12);
        assert!((smoothed[4] - 4.5).abs() < 1e-12);
        assert_eq!(moving_average(&x, 1), x.to_vec());
    }
}
